//! Publisher error types.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the broker link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Could not establish a broker session
    #[error("Broker connection failed: {0}")]
    Connect(String),

    /// The broker rejected or dropped a publish
    #[error("Publish failed: {0}")]
    Send(String),

    /// Liveness probe failed on an established session
    #[error("Keepalive failed: {0}")]
    Keepalive(String),

    /// Broker did not answer in time
    #[error("Broker did not respond within {0:?}")]
    Timeout(Duration),

    /// Publisher has been shut down
    #[error("Publisher stopped")]
    Stopped,
}

impl PublishError {
    /// True for failures that tear down the current broker session.
    pub fn is_transport(&self) -> bool {
        !matches!(self, PublishError::Stopped)
    }
}

/// Result type alias using PublishError.
pub type PublishResult<T> = Result<T, PublishError>;
