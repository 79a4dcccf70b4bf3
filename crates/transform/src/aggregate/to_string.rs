//! Aggregate-to-string transform
//!
//! Buffers data messages into keyed batches and emits each batch as one
//! payload with the items joined by a separator (newline by default).

use std::future::Future;
use std::pin::Pin;

use sluice_message::{value_to_string, Message};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::aggregate::Aggregate;
use crate::config::{decode_settings, summarize, BatchConfig, ObjectConfig, TransformConfig};
use crate::registry::{TransformerFactory, TransformerRegistry};
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "to_string_test.rs"]
mod tests;

fn default_separator() -> String {
    "\n".to_string()
}

/// Configuration for [`AggregateToString`]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AggregateStringConfig {
    /// Stage identifier used in errors and logs
    pub id: String,

    /// Separator placed between joined items
    #[serde(default = "default_separator")]
    pub separator: String,

    /// `batch_key` derives the aggregation key
    pub object: ObjectConfig,

    /// Batch bounds
    pub batch: BatchConfig,
}

impl Default for AggregateStringConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            separator: default_separator(),
            object: ObjectConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

/// Stateful transform joining batched payloads with a separator
pub struct AggregateToString {
    conf: AggregateStringConfig,
    id: String,

    state: Mutex<Aggregate>,
}

impl AggregateToString {
    /// Create the transform from its decoded configuration
    pub fn new(mut conf: AggregateStringConfig) -> Self {
        if conf.id.is_empty() {
            conf.id = "aggregate_to_string".to_string();
        }

        Self {
            id: conf.id.clone(),
            state: Mutex::new(Aggregate::new(&conf.batch)),
            conf,
        }
    }

    fn batch_message(&self, items: &[Vec<u8>]) -> Message {
        let payload = items.join(self.conf.separator.as_bytes());
        Message::from_payload(payload)
    }

    async fn process(&self, msg: Message) -> TransformResult<Vec<Message>> {
        let mut agg = self.state.lock().await;

        if msg.is_control() {
            let mut output = Vec::new();
            for key in agg.keys() {
                if agg.count(&key) == 0 {
                    continue;
                }
                output.push(self.batch_message(agg.get(&key)));
            }

            agg.reset_all();
            tracing::debug!(id = %self.id, flushed = output.len(), "control flush");

            output.push(msg);
            return Ok(output);
        }

        let key = match msg.get_value(&self.conf.object.batch_key) {
            Some(value) => value_to_string(&value),
            None => String::new(),
        };

        if agg.add(&key, msg.payload()) {
            return Ok(Vec::new());
        }

        let out = self.batch_message(agg.get(&key));

        agg.reset(&key);
        if !agg.add(&key, msg.payload()) {
            return Err(TransformError::BatchMisconfigured {
                id: self.id.clone(),
            });
        }

        Ok(vec![out])
    }
}

impl Transformer for AggregateToString {
    fn transform<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = TransformResult<Vec<Message>>> + Send + 'a>> {
        Box::pin(self.process(msg))
    }

    fn name(&self) -> &'static str {
        "aggregate_to_string"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        summarize(&self.conf)
    }
}

/// Factory for [`AggregateToString`]
#[derive(Debug, Clone, Copy)]
pub struct ToStringFactory;

impl TransformerFactory for ToStringFactory {
    fn create(
        &self,
        _registry: &TransformerRegistry,
        config: &TransformConfig,
    ) -> TransformResult<Box<dyn Transformer>> {
        let conf: AggregateStringConfig = decode_settings(&config.settings)?;
        Ok(Box::new(AggregateToString::new(conf)))
    }

    fn name(&self) -> &'static str {
        "aggregate_to_string"
    }
}
