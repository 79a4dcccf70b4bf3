//! Message error types

use thiserror::Error;

/// Errors raised by structured access to message payloads
#[derive(Debug, Error)]
pub enum MessageError {
    /// The payload is non-empty and not valid JSON text
    #[error("payload is not valid JSON")]
    NotJson,

    /// The path expression is malformed (e.g. empty segment)
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// The modified payload could not be re-serialized
    #[error("failed to serialize payload: {0}")]
    Serialize(String),
}
