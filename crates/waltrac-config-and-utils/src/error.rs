//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading configuration at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Broker endpoint URI is malformed or uses an unsupported scheme
    #[error("Invalid broker endpoint: {0}")]
    InvalidEndpoint(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Required setting is absent
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
