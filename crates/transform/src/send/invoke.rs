//! Retryable external delivery capability
//!
//! Sinks hand drained batch items to an [`Invoke`] implementation, one call
//! per item. The [`Retrier`] wraps any invoker with a bounded attempt
//! budget, exponential backoff, and an allow-list of retryable error
//! classes; an error surviving the budget is fatal for the enclosing flush.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
#[path = "invoke_test.rs"]
mod tests;

/// Classification of external call failures, used to decide retryability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The call did not complete in time
    Timeout,

    /// The destination is temporarily unreachable
    Unavailable,

    /// The destination applied rate limiting
    Throttled,

    /// The call can never succeed as issued
    Permanent,
}

/// An external call failure
#[derive(Debug, Clone, Error)]
#[error("{class:?}: {message}")]
pub struct InvokeError {
    /// Failure classification
    pub class: ErrorClass,

    /// Human-readable description
    pub message: String,
}

impl InvokeError {
    /// Create an error with an explicit class
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    /// Create a permanent (never retried) error
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Permanent, message)
    }

    /// Create an unavailable (retryable by default) error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unavailable, message)
    }
}

/// One external delivery call per drained batch item.
///
/// Implementations must be `Send + Sync` and honor the cancellation token,
/// returning promptly when it fires.
pub trait Invoke: Send + Sync {
    /// Deliver one payload to the external destination
    fn invoke<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        payload: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), InvokeError>> + Send + 'a>>;
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    100
}

fn default_retryable() -> Vec<ErrorClass> {
    vec![
        ErrorClass::Timeout,
        ErrorClass::Unavailable,
        ErrorClass::Throttled,
    ]
}

/// Retry budget for external calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first (minimum 1)
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Base backoff; attempt `n` waits `backoff_ms * 2^(n-1)`
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Error classes worth retrying; anything else fails immediately
    #[serde(default = "default_retryable")]
    pub retryable: Vec<ErrorClass>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
            retryable: default_retryable(),
        }
    }
}

/// An [`Invoke`] wrapped with a bounded retry budget
pub struct Retrier {
    inner: Box<dyn Invoke>,
    conf: RetryConfig,
}

impl Retrier {
    /// Wrap an invoker with a retry budget
    pub fn new(inner: Box<dyn Invoke>, conf: RetryConfig) -> Self {
        Self { inner, conf }
    }

    /// Deliver one payload, retrying allow-listed failures up to the budget.
    ///
    /// Backoff sleeps are raced against the cancellation token; a cancelled
    /// wait surfaces the last observed error.
    pub async fn invoke(
        &self,
        cancel: &CancellationToken,
        payload: &[u8],
    ) -> Result<(), InvokeError> {
        let attempts = self.conf.attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.inner.invoke(cancel, payload).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempt += 1;
                    if attempt >= attempts || !self.conf.retryable.contains(&err.class) {
                        return Err(err);
                    }

                    tracing::warn!(
                        attempt,
                        class = ?err.class,
                        error = %err.message,
                        "external call failed, retrying"
                    );

                    let backoff =
                        Duration::from_millis(self.conf.backoff_ms << (attempt - 1).min(16));
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(err),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }
}
