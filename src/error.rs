use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid proxy url for {owner}: {source}")]
    Proxy {
        owner: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid schedule '{expr}': {reason}")]
    Schedule { expr: String, reason: String },

    #[error("invalid mail address '{address}': {reason}")]
    MailAddress { address: String, reason: String },

    #[error("invalid smtp server '{0}', expected host:port")]
    SmtpServer(String),

    #[error("invalid PORT value '{0}'")]
    Port(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat api responded with status {0}")]
    ChatStatus(u16),

    #[error("invalid mail address '{address}': {reason}")]
    MailAddress { address: String, reason: String },

    #[error("smtp delivery failed: {0}")]
    Smtp(String),
}
