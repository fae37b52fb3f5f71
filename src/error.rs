//! Error types for Marketdesk

use thiserror::Error;

use crate::routes::LOGIN_PATH;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'marketdesk init' first.")]
    ConfigNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid token: {0}")]
    Decode(String),

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Session is no longer valid, please log in again")]
    Unauthorized,

    #[error("Stored session is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("Screen '{0}' not found")]
    ScreenNotFound(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
}

impl Error {
    /// Screen the caller should navigate to after this error, if any
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Error::Unauthorized => Some(LOGIN_PATH),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
