use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;

/// Status of an app that has not been probed yet.
pub const NEVER_PROBED: i32 = 0;
/// Status recorded when the probe could not complete (DNS, connect, TLS, timeout).
pub const PROBE_FAILED: i32 = -1;
pub const HEALTHY: i32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    BecameUp,
    BecameDown,
}

impl Transition {
    /// Edge-triggered on crossing into or out of exactly 200. An unknown
    /// previous status counts as up, so an app that is dead on startup is
    /// reported on its first probe.
    pub fn classify(previous: i32, current: i32) -> Self {
        let was_up = previous == NEVER_PROBED || previous == HEALTHY;
        match (was_up, current == HEALTHY) {
            (false, true) => Transition::BecameUp,
            (true, false) => Transition::BecameDown,
            _ => Transition::NoChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppStatus {
    pub status_code: i32,
    pub checked_at: Option<DateTime<Local>>,
}

impl Default for AppStatus {
    fn default() -> Self {
        Self { status_code: NEVER_PROBED, checked_at: None }
    }
}

impl AppStatus {
    pub fn observed(status_code: i32, at: DateTime<Local>) -> Self {
        Self { status_code, checked_at: Some(at) }
    }

    pub fn checked_at_display(&self) -> String {
        self.checked_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    }
}

/// A classified transition ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub app_name: String,
    pub url: String,
    pub transition: Transition,
    pub status_code: i32,
}

impl TransitionEvent {
    pub fn is_up(&self) -> bool {
        self.transition == Transition::BecameUp
    }

    pub fn headline(&self) -> &'static str {
        if self.is_up() { "healthcheck recovered" } else { "healthcheck error" }
    }

    /// Plain-text summary shared by every channel.
    pub fn summary(&self) -> String {
        format!(
            "\nMessage: {}\nApp: {}\nStatus Code: {}\nURL: {}",
            self.headline(),
            self.app_name,
            self.status_code,
            self.url
        )
    }
}

/// Row served by `/api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub name: String,
    pub url: String,
    pub status_code: i32,
    pub checked_at: String,
}
