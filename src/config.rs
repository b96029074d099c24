use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 18888;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct NotifierConfig {
    pub cron: String,
    #[serde(default)]
    pub hipchat_proxy: String,
    #[serde(default)]
    pub hipchat_subdomain: String,
    #[serde(default = "default_hipchat_api_base")]
    pub hipchat_api_base: String,
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default)]
    pub mail_address_from: String,
    #[serde(default)]
    pub apps: Vec<AppConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub proxy: String,
    #[serde(default)]
    pub hipchat_room: String,
    #[serde(default)]
    pub hipchat_token: String,
    #[serde(default)]
    pub mail_address_to_down: Vec<String>,
    #[serde(default)]
    pub mail_address_to_up: Vec<String>,
}

fn default_hipchat_api_base() -> String { "https://api.hipchat.com".into() }

impl NotifierConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Resolves the dashboard port from the raw `PORT` value. Unset and empty both
/// fall back to the default.
pub fn listen_port(raw: Option<String>) -> Result<u16, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(DEFAULT_PORT),
        Some(value) => value.parse().map_err(|_| ConfigError::Port(value.to_string())),
    }
}
