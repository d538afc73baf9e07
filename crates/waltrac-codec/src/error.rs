//! Codec error types.

use thiserror::Error;

/// Errors raised while decoding or encoding wire messages.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Buffer is too short, a length prefix overruns it, or bytes are left over.
    #[error("framing error: {0}")]
    Framing(String),

    /// A text field is not valid UTF-8.
    #[error("invalid UTF-8 in {field}: {source}")]
    Encoding {
        field: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },

    /// A text field does not fit its one-byte length prefix.
    #[error("{field} is {len} bytes, maximum is 255")]
    TextTooLong { field: &'static str, len: usize },

    /// The MAC primitive rejected the key.
    #[error("invalid signing key: {0}")]
    Key(String),
}

impl CodecError {
    /// True for truncated, over-long or otherwise mis-framed buffers.
    pub fn is_framing(&self) -> bool {
        matches!(self, CodecError::Framing(_))
    }

    /// True when a text field failed UTF-8 validation.
    pub fn is_encoding(&self) -> bool {
        matches!(self, CodecError::Encoding { .. })
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
