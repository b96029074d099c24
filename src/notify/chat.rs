use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{Delivery, Notifier};
use crate::config::{AppConfig, NotifierConfig};
use crate::error::{ConfigError, NotifyError};
use crate::models::TransitionEvent;
use crate::probe::build_client;

/// HipChat v2 room notification body.
#[derive(Debug, Serialize)]
struct RoomNotification<'a> {
    notify: bool,
    message_format: &'a str,
    color: &'a str,
    message: String,
}

pub struct ChatNotifier {
    client: reqwest::Client,
    api_base: String,
}

impl ChatNotifier {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &NotifierConfig) -> Result<Self, ConfigError> {
        let client = build_client(&config.hipchat_proxy, "hipchat")?;
        Ok(Self::new(client, config.hipchat_api_base.clone()))
    }

    fn endpoint(&self, room: &str, token: &str) -> String {
        format!("{}/v2/room/{}/notification?auth_token={}", self.api_base, room, token)
    }
}

#[async_trait]
impl Notifier for ChatNotifier {
    fn name(&self) -> &str {
        "hipchat"
    }

    async fn notify(&self, app: &AppConfig, event: &TransitionEvent) -> Result<Delivery, NotifyError> {
        if app.hipchat_room.is_empty() || app.hipchat_token.is_empty() {
            return Ok(Delivery::Skipped);
        }

        let payload = RoomNotification {
            notify: true,
            message_format: "text",
            color: if event.is_up() { "green" } else { "red" },
            message: format!("@all\n{}", event.summary()),
        };

        let response = self
            .client
            .post(self.endpoint(&app.hipchat_room, &app.hipchat_token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::ChatStatus(status.as_u16()));
        }
        debug!(app = %app.name, status = status.as_u16(), "hipchat accepted notification");
        Ok(Delivery::Sent)
    }
}
