//! Transform error types
//!
//! Errors that can occur while building or running a pipeline. Nothing is
//! ever swallowed: runtime failures carry the failing stage's identifier and
//! index so the operator can locate the stage in configuration.

use sluice_message::MessageError;
use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors that can occur during pipeline construction or transformation
#[derive(Debug, Error)]
pub enum TransformError {
    /// Invalid configuration: missing option, malformed settings, or an
    /// unknown type tag. Raised at construction time only.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A stage's pre-use validation rejected its decoded settings
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transformation logic failed
    #[error("transform failed: {0}")]
    TransformFailed(String),

    /// Runtime failure wrapped with the failing stage's identity.
    ///
    /// Added by [`apply`](crate::apply); the whole call aborts on the first
    /// occurrence and no partial message list is returned.
    #[error("transform {id} (stage {index}): {source}")]
    Stage {
        id: String,
        index: usize,
        #[source]
        source: Box<TransformError>,
    },

    /// A single item cannot fit a freshly reset, empty batch.
    ///
    /// Always fatal: the operator must add a filtering or size-reducing step
    /// upstream. The item is never split or dropped.
    #[error("transform {id}: batch is misconfigured, item exceeds a batch bound")]
    BatchMisconfigured { id: String },

    /// An external call failed after the sink's retry budget was exhausted
    #[error("external call failed: {0}")]
    Invoke(String),

    /// Structured payload access failed
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// I/O error (e.g. file-backed sinks)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation cancelled
    #[error("operation cancelled")]
    Cancelled,
}

impl TransformError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a transform failed error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::TransformFailed(msg.into())
    }

    /// Wrap a stage failure with the stage's identifier and index
    pub fn stage(id: impl Into<String>, index: usize, source: TransformError) -> Self {
        Self::Stage {
            id: id.into(),
            index,
            source: Box::new(source),
        }
    }
}
