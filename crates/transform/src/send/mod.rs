//! Batching sinks
//!
//! A sink is a stateful transformer combining three pieces: a keyed
//! [`Aggregate`] buffering payloads, an ordered list of auxiliary
//! transforms applied to a drained batch immediately before transmission
//! (array-wrapping, compression, and the like), and a retryable [`Invoke`]
//! capability performing the external call, one call per resulting batch
//! item.
//!
//! # Contract
//!
//! - Accepted data messages pass through unmodified; delivery is
//!   fire-and-forget and never blocks the pipeline on the remote call's
//!   result.
//! - A rejected `add` runs the retry-on-reject protocol: flush the open
//!   batch, reset the key, retry once; a second rejection is fatal.
//! - A control message flushes every key with buffered data, resets all
//!   state, then forwards the control message last.
//! - A single message above [`SEND_SIZE_LIMIT`] is rejected outright; it is
//!   never split.
//!
//! The instance lock is held across the external fan-out, deliberately
//! serializing sends per sink instance so resets cannot interleave with
//! in-flight flushes.

mod file;
mod invoke;
mod stdout;

pub use file::{FileFactory, SendFileConfig};
pub use invoke::{ErrorClass, Invoke, InvokeError, Retrier, RetryConfig};
pub use stdout::StdoutFactory;

use std::future::Future;
use std::pin::Pin;

use sluice_message::{value_to_string, Message};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::aggregate::Aggregate;
use crate::apply::apply;
use crate::config::{summarize, BatchConfig, ObjectConfig, TransformConfig};
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "send_test.rs"]
mod tests;

/// Hard per-item payload ceiling: 256 MiB
pub const SEND_SIZE_LIMIT: usize = 256 * 1024 * 1024;

/// Common configuration shared by every batching sink
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SendConfig {
    /// Stage identifier used in errors and logs
    pub id: String,

    /// `batch_key` derives the per-message aggregation key; empty keeps a
    /// single global batch
    pub object: ObjectConfig,

    /// Batch bounds
    pub batch: BatchConfig,

    /// Transforms applied to a drained batch before transmission
    pub auxiliary_transforms: Vec<TransformConfig>,

    /// Retry budget for the external call
    pub retry: RetryConfig,
}

struct SendState {
    agg: Aggregate,
    aux: Vec<Box<dyn Transformer>>,
}

/// The canonical batching sink: aggregate, pre-send transforms, retryable
/// external delivery.
///
/// Concrete sinks differ only in their [`Invoke`] implementation; embedders
/// can plug in their own via [`SendTransform::new`].
pub struct SendTransform {
    name: &'static str,
    id: String,
    summary: String,
    batch_key: String,

    state: Mutex<SendState>,
    invoker: Retrier,
}

impl SendTransform {
    /// Assemble a sink from its parts.
    ///
    /// `aux` transforms must already be built (the factories construct them
    /// through the registry).
    pub fn new(
        name: &'static str,
        conf: &SendConfig,
        aux: Vec<Box<dyn Transformer>>,
        invoke: Box<dyn Invoke>,
    ) -> Self {
        let id = if conf.id.is_empty() {
            name.to_string()
        } else {
            conf.id.clone()
        };

        Self {
            name,
            id,
            summary: summarize(conf),
            batch_key: conf.object.batch_key.clone(),
            state: Mutex::new(SendState {
                agg: Aggregate::new(&conf.batch),
                aux,
            }),
            invoker: Retrier::new(invoke, conf.retry.clone()),
        }
    }

    async fn process(
        &self,
        cancel: &CancellationToken,
        msg: Message,
    ) -> TransformResult<Vec<Message>> {
        let mut state = self.state.lock().await;

        if msg.is_control() {
            for key in state.agg.keys() {
                if state.agg.count(&key) == 0 {
                    continue;
                }
                self.flush(cancel, &state, &key).await?;
            }

            state.agg.reset_all();
            return Ok(vec![msg]);
        }

        if msg.payload().len() > SEND_SIZE_LIMIT {
            return Err(TransformError::failed(format!(
                "message of {} bytes exceeds the {} byte send limit",
                msg.payload().len(),
                SEND_SIZE_LIMIT
            )));
        }

        // An unset batch key batches everything together.
        let key = match msg.get_value(&self.batch_key) {
            Some(value) => value_to_string(&value),
            None => String::new(),
        };

        if state.agg.add(&key, msg.payload()) {
            return Ok(vec![msg]);
        }

        // A bound was hit: deliver the open batch, then retry on a fresh
        // window. A second rejection means the item alone exceeds a bound.
        self.flush(cancel, &state, &key).await?;

        state.agg.reset(&key);
        if !state.agg.add(&key, msg.payload()) {
            return Err(TransformError::BatchMisconfigured {
                id: self.id.clone(),
            });
        }

        Ok(vec![msg])
    }

    async fn flush(
        &self,
        cancel: &CancellationToken,
        state: &SendState,
        key: &str,
    ) -> TransformResult<()> {
        let items = state.agg.get(key).to_vec();
        let count = items.len();
        let payloads = apply_aux(cancel, &state.aux, items).await?;

        for payload in &payloads {
            if cancel.is_cancelled() {
                return Err(TransformError::Cancelled);
            }

            self.invoker
                .invoke(cancel, payload)
                .await
                .map_err(|err| TransformError::Invoke(err.to_string()))?;
        }

        tracing::debug!(
            id = %self.id,
            key,
            items = count,
            calls = payloads.len(),
            "flushed batch"
        );
        Ok(())
    }
}

impl Transformer for SendTransform {
    fn transform<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = TransformResult<Vec<Message>>> + Send + 'a>> {
        Box::pin(self.process(cancel, msg))
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        self.summary.clone()
    }
}

/// Run a drained batch through the auxiliary transforms.
///
/// Items are wrapped in data messages and a trailing control message is
/// appended so aggregating stages (array-wrapping, joining) flush; control
/// messages are stripped from the output.
async fn apply_aux(
    cancel: &CancellationToken,
    aux: &[Box<dyn Transformer>],
    items: Vec<Vec<u8>>,
) -> TransformResult<Vec<Vec<u8>>> {
    if aux.is_empty() {
        return Ok(items);
    }

    let mut msgs: Vec<Message> = items.into_iter().map(Message::from_payload).collect();
    msgs.push(Message::control());

    let out = apply(cancel, aux, msgs).await?;
    Ok(out
        .into_iter()
        .filter(|msg| !msg.is_control())
        .map(Message::into_payload)
        .collect())
}
