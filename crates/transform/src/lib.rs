//! Sluice - Transform
//!
//! Transform composition for message pipelines.
//!
//! # Overview
//!
//! A pipeline is an ordered list of transformers applied to messages via
//! [`apply`]. Each stage maps one input message to zero or more outputs:
//! zero terminates that branch (buffering stages withhold output until a
//! window bound is hit), more than one fans the message out. A trailing
//! control message flushes every stateful stage at the end of a stream.
//!
//! # Architecture
//!
//! ```text
//! [Message] → [Transformer 1] → [Transformer 2] → ... → [Messages]
//!                                     |
//!                               [Aggregate] → flush → [Invoke]
//! ```
//!
//! Transformers are built from configuration through a
//! [`TransformerRegistry`]: a `{ "type": tag, "settings": {...} }` pair
//! selects a registered factory, which decodes the settings into a typed
//! config and fails fast on anything invalid. Unknown type tags are a
//! construction-time error, never a runtime one.
//!
//! # Adding a New Transformer
//!
//! 1. Create a `#[serde(default)]` config struct and validate it in the
//!    constructor.
//! 2. Implement [`Transformer`]. Stateless stages must pass control
//!    messages through unchanged; stateful stages must flush every buffered
//!    key, emit the control message last, and reset their state.
//! 3. Implement [`TransformerFactory`] and register it with the registry.
//!
//! # Modules
//!
//! - `aggregate` - Bounded keyed batch buffer and aggregation transforms
//! - `meta` - Composite transforms (nested pipelines, per-element apply)
//! - `send` - Batching sinks delivering to a retryable invoke capability
//! - `noop` - Pass-through transformer for testing
//!
//! # Example
//!
//! ```ignore
//! use sluice_transform::{apply, default_registry, TransformConfig};
//! use sluice_message::Message;
//! use tokio_util::sync::CancellationToken;
//!
//! let registry = default_registry();
//! let configs: Vec<TransformConfig> = serde_json::from_str(config_text)?;
//! let pipeline = registry.build_all(&configs)?;
//!
//! let cancel = CancellationToken::new();
//! let out = apply(&cancel, &pipeline, vec![msg, Message::control()]).await?;
//! ```

use std::future::Future;
use std::pin::Pin;

use sluice_message::Message;
use tokio_util::sync::CancellationToken;

pub mod aggregate;
mod apply;
mod config;
mod error;
pub mod meta;
pub mod noop;
mod registry;
pub mod send;

pub use aggregate::{
    Aggregate, AggregateFromArray, AggregateToArray, AggregateToString, FromArrayFactory,
    ToArrayFactory, ToStringFactory,
};
pub use apply::apply;
pub use config::{BatchConfig, ObjectConfig, TransformConfig};
pub use error::TransformError;
pub use meta::{ForEachFactory, MetaForEach, MetaPipeline, PipelineFactory};
pub use noop::{Noop, NoopFactory};
pub use registry::{default_registry, TransformerFactory, TransformerRegistry};
pub use send::{
    ErrorClass, FileFactory, Invoke, InvokeError, Retrier, RetryConfig, SendConfig,
    SendTransform, StdoutFactory, SEND_SIZE_LIMIT,
};

/// Result type for transformer operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Trait implemented by every pipeline stage.
///
/// Implementors must be `Send + Sync`; a single instance may be invoked from
/// many tasks concurrently. Stateless stages need no synchronization.
/// Stateful stages (anything owning an [`Aggregate`] or nested pipeline)
/// must serialize each `transform` call behind their own lock, held for the
/// full call including any flush fan-out it triggers.
pub trait Transformer: Send + Sync {
    /// Transform one message into zero or more output messages.
    ///
    /// An empty output vector ends that message's branch. Control messages
    /// must be handled by every implementation: stateless stages return them
    /// unchanged, buffering stages flush and emit the control message last.
    ///
    /// The cancellation token must be honored by any blocking work; a
    /// cancelled call returns [`TransformError::Cancelled`] promptly.
    fn transform<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = TransformResult<Vec<Message>>> + Send + 'a>>;

    /// The stage's type tag (e.g. "aggregate_to_array")
    fn name(&self) -> &'static str;

    /// The stage identifier used in error wrapping and logs.
    ///
    /// Defaults to the type tag; stages with a configured `id` report it
    /// instead.
    fn id(&self) -> &str {
        self.name()
    }

    /// Normalized configuration, re-serialized from the decoded settings.
    ///
    /// Used for introspection and logging; defaults to an empty object for
    /// stages without settings.
    fn summary(&self) -> String {
        "{}".to_string()
    }
}

impl std::fmt::Debug for dyn Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("name", &self.name())
            .field("id", &self.id())
            .finish()
    }
}
