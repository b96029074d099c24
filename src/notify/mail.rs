use std::sync::Arc;

use async_trait::async_trait;
use lettre::address::{Address, Envelope};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::debug;

use super::{Delivery, Notifier};
use crate::config::{AppConfig, NotifierConfig};
use crate::error::{ConfigError, NotifyError};
use crate::models::TransitionEvent;

/// A fully formatted plaintext message plus its delivery recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Value of the `To:` header. Display only; delivery uses [`Self::envelope_recipients`].
    pub fn to_line(&self) -> String {
        self.recipients.join(", ")
    }

    /// Distinct recipients in configured order.
    pub fn envelope_recipients(&self) -> Vec<&str> {
        let mut seen = Vec::with_capacity(self.recipients.len());
        for r in &self.recipients {
            if !seen.contains(&r.as_str()) {
                seen.push(r.as_str());
            }
        }
        seen
    }

    pub fn raw(&self) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\n\r\n{}\r\n",
            self.from,
            self.to_line(),
            self.subject,
            self.body.replace("\r\n", "\n").replace('\n', "\r\n")
        )
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), NotifyError>;
}

/// Unauthenticated plaintext submission to a relay.
pub struct SmtpTransport {
    relay: String,
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(server: &str) -> Result<Self, ConfigError> {
        let (host, port) = server
            .rsplit_once(':')
            .filter(|(host, _)| !host.is_empty())
            .ok_or_else(|| ConfigError::SmtpServer(server.to_string()))?;
        let port: u16 = port.parse().map_err(|_| ConfigError::SmtpServer(server.to_string()))?;
        let inner = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();
        Ok(Self { relay: server.to_string(), inner })
    }
}

fn parse_address(address: &str) -> Result<Address, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::MailAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), NotifyError> {
        let from = parse_address(&mail.from)?;
        let to = mail
            .envelope_recipients()
            .into_iter()
            .map(parse_address)
            .collect::<Result<Vec<_>, _>>()?;
        let envelope = Envelope::new(Some(from), to).map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.inner
            .send_raw(&envelope, mail.raw().as_bytes())
            .await
            .map_err(|e| NotifyError::Smtp(format!("{}: {}", self.relay, e)))?;
        Ok(())
    }
}

pub struct MailNotifier {
    from: String,
    transport: Option<Arc<dyn MailTransport>>,
}

impl MailNotifier {
    pub fn new(from: impl Into<String>, transport: Option<Arc<dyn MailTransport>>) -> Self {
        Self { from: from.into(), transport }
    }

    /// Builds the SMTP-backed notifier. Addresses are checked up front so a
    /// typo fails startup instead of the first alert.
    pub fn from_config(config: &NotifierConfig) -> Result<Self, ConfigError> {
        if config.smtp_server.is_empty() {
            return Ok(Self::new(config.mail_address_from.clone(), None));
        }

        let addresses = std::iter::once(&config.mail_address_from)
            .filter(|a| !a.is_empty())
            .chain(config.apps.iter().flat_map(|app| {
                app.mail_address_to_down.iter().chain(&app.mail_address_to_up)
            }));
        for address in addresses {
            address.parse::<Address>().map_err(|e| ConfigError::MailAddress {
                address: address.clone(),
                reason: e.to_string(),
            })?;
        }

        let transport = SmtpTransport::new(&config.smtp_server)?;
        Ok(Self::new(config.mail_address_from.clone(), Some(Arc::new(transport))))
    }

    /// Message for `event`, or `None` when mail is not configured for its direction.
    pub fn compose(&self, app: &AppConfig, event: &TransitionEvent) -> Option<OutgoingMail> {
        let (recipients, tag) = if event.is_up() {
            (&app.mail_address_to_up, "UP")
        } else {
            (&app.mail_address_to_down, "DOWN")
        };
        if self.from.is_empty() || recipients.is_empty() {
            return None;
        }
        Some(OutgoingMail {
            from: self.from.clone(),
            recipients: recipients.clone(),
            subject: format!("[{}] {}", tag, app.name),
            body: event.summary(),
        })
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    fn name(&self) -> &str {
        "mail"
    }

    async fn notify(&self, app: &AppConfig, event: &TransitionEvent) -> Result<Delivery, NotifyError> {
        let Some(transport) = &self.transport else {
            return Ok(Delivery::Skipped);
        };
        let Some(mail) = self.compose(app, event) else {
            return Ok(Delivery::Skipped);
        };

        transport.deliver(&mail).await?;
        debug!(app = %app.name, to = %mail.to_line(), "mail relayed");
        Ok(Delivery::Sent)
    }
}
