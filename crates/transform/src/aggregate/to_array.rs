//! Aggregate-to-array transform
//!
//! Buffers data messages into keyed batches and emits each batch as a
//! single JSON array message. Output is withheld until a batch bound is hit
//! or a control message arrives.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use sluice_message::{bytes_to_value, value_to_string, Message};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::aggregate::Aggregate;
use crate::config::{decode_settings, summarize, BatchConfig, ObjectConfig, TransformConfig};
use crate::registry::{TransformerFactory, TransformerRegistry};
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "to_array_test.rs"]
mod tests;

/// Configuration for [`AggregateToArray`]
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AggregateArrayConfig {
    /// Stage identifier used in errors and logs
    pub id: String,

    /// `batch_key` derives the aggregation key; `target_key` wraps the
    /// array in an object instead of emitting it as the whole payload
    pub object: ObjectConfig,

    /// Batch bounds
    pub batch: BatchConfig,
}

/// Stateful transform batching messages into JSON arrays
pub struct AggregateToArray {
    conf: AggregateArrayConfig,
    id: String,

    state: Mutex<Aggregate>,
}

impl AggregateToArray {
    /// Create the transform from its decoded configuration
    pub fn new(mut conf: AggregateArrayConfig) -> Self {
        if conf.id.is_empty() {
            conf.id = "aggregate_to_array".to_string();
        }

        Self {
            id: conf.id.clone(),
            state: Mutex::new(Aggregate::new(&conf.batch)),
            conf,
        }
    }

    fn batch_message(&self, items: &[Vec<u8>]) -> TransformResult<Message> {
        let array = Value::Array(items.iter().map(|item| bytes_to_value(item)).collect());

        let mut out = Message::new();
        if self.conf.object.target_key.is_empty() {
            let payload = serde_json::to_vec(&array)
                .map_err(|err| TransformError::failed(err.to_string()))?;
            out.set_payload(payload);
        } else {
            out.set_value(&self.conf.object.target_key, array)?;
        }

        Ok(out)
    }

    async fn process(&self, msg: Message) -> TransformResult<Vec<Message>> {
        let mut agg = self.state.lock().await;

        if msg.is_control() {
            let mut output = Vec::new();
            for key in agg.keys() {
                if agg.count(&key) == 0 {
                    continue;
                }
                output.push(self.batch_message(agg.get(&key))?);
            }

            agg.reset_all();
            tracing::debug!(id = %self.id, flushed = output.len(), "control flush");

            output.push(msg);
            return Ok(output);
        }

        // An unset batch key batches everything together.
        let key = match msg.get_value(&self.conf.object.batch_key) {
            Some(value) => value_to_string(&value),
            None => String::new(),
        };

        if agg.add(&key, msg.payload()) {
            return Ok(Vec::new());
        }

        // A bound was hit: emit the open batch, then retry on a fresh
        // window. A second rejection means the item alone exceeds a bound.
        let out = self.batch_message(agg.get(&key))?;

        agg.reset(&key);
        if !agg.add(&key, msg.payload()) {
            return Err(TransformError::BatchMisconfigured {
                id: self.id.clone(),
            });
        }

        Ok(vec![out])
    }
}

impl Transformer for AggregateToArray {
    fn transform<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = TransformResult<Vec<Message>>> + Send + 'a>> {
        Box::pin(self.process(msg))
    }

    fn name(&self) -> &'static str {
        "aggregate_to_array"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        summarize(&self.conf)
    }
}

/// Factory for [`AggregateToArray`]
#[derive(Debug, Clone, Copy)]
pub struct ToArrayFactory;

impl TransformerFactory for ToArrayFactory {
    fn create(
        &self,
        _registry: &TransformerRegistry,
        config: &TransformConfig,
    ) -> TransformResult<Box<dyn Transformer>> {
        let conf: AggregateArrayConfig = decode_settings(&config.settings)?;
        Ok(Box::new(AggregateToArray::new(conf)))
    }

    fn name(&self) -> &'static str {
        "aggregate_to_array"
    }
}
