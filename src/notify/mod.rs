//! Transition notification channels.
//!
//! Each channel decides for itself whether an app is configured for it; an
//! unconfigured app yields [`Delivery::Skipped`] without any outbound call.

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::NotifyError;
use crate::models::TransitionEvent;

pub mod chat;
pub mod mail;

pub use chat::ChatNotifier;
pub use mail::MailNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, app: &AppConfig, event: &TransitionEvent) -> Result<Delivery, NotifyError>;
}
