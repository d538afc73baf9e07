//! Error types for the gateway.

use thiserror::Error;

/// Gateway error type.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Socket error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CoAP message could not be built
    #[error("CoAP error: {0}")]
    Coap(String),
}

/// Result type alias using GatewayError.
pub type GatewayResult<T> = Result<T, GatewayError>;
