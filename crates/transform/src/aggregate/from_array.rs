//! Aggregate-from-array transform
//!
//! Stateless fan-out: splits a JSON array into one message per element.
//! The counterpart to [`AggregateToArray`](super::AggregateToArray), used to
//! unpack previously batched payloads or explode array-valued fields.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use sluice_message::{bytes_to_value, value_to_bytes, Message};
use tokio_util::sync::CancellationToken;

use crate::config::{decode_settings, summarize, ObjectConfig, TransformConfig};
use crate::registry::{TransformerFactory, TransformerRegistry};
use crate::{TransformResult, Transformer};

#[cfg(test)]
#[path = "from_array_test.rs"]
mod tests;

/// Configuration for [`AggregateFromArray`]
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AggregateFromArrayConfig {
    /// Stage identifier used in errors and logs
    pub id: String,

    /// `source_key` reads the array from a path instead of the whole
    /// payload; `target_key` writes each element under a path instead of
    /// making it the whole payload
    pub object: ObjectConfig,
}

/// Stateless transform fanning an array out into individual messages
pub struct AggregateFromArray {
    conf: AggregateFromArrayConfig,
    id: String,
}

impl AggregateFromArray {
    /// Create the transform from its decoded configuration
    pub fn new(mut conf: AggregateFromArrayConfig) -> Self {
        if conf.id.is_empty() {
            conf.id = "aggregate_from_array".to_string();
        }

        Self {
            id: conf.id.clone(),
            conf,
        }
    }

    fn process(&self, msg: Message) -> TransformResult<Vec<Message>> {
        if msg.is_control() {
            return Ok(vec![msg]);
        }

        let value = if self.conf.object.source_key.is_empty() {
            bytes_to_value(msg.payload())
        } else {
            match msg.get_value(&self.conf.object.source_key) {
                Some(value) => value,
                None => return Ok(vec![msg]),
            }
        };

        let Value::Array(elements) = value else {
            // Not an array; nothing to fan out.
            return Ok(vec![msg]);
        };

        let metadata = msg.metadata().clone();
        let mut output = Vec::with_capacity(elements.len());

        for element in elements {
            let mut out = Message::new();
            out.set_metadata(metadata.clone());

            if self.conf.object.target_key.is_empty() {
                out.set_payload(value_to_bytes(&element));
            } else {
                out.set_value(&self.conf.object.target_key, element)?;
            }

            output.push(out);
        }

        Ok(output)
    }
}

impl Transformer for AggregateFromArray {
    fn transform<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = TransformResult<Vec<Message>>> + Send + 'a>> {
        let result = self.process(msg);
        Box::pin(async move { result })
    }

    fn name(&self) -> &'static str {
        "aggregate_from_array"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        summarize(&self.conf)
    }
}

/// Factory for [`AggregateFromArray`]
#[derive(Debug, Clone, Copy)]
pub struct FromArrayFactory;

impl TransformerFactory for FromArrayFactory {
    fn create(
        &self,
        _registry: &TransformerRegistry,
        config: &TransformConfig,
    ) -> TransformResult<Box<dyn Transformer>> {
        let conf: AggregateFromArrayConfig = decode_settings(&config.settings)?;
        Ok(Box::new(AggregateFromArray::new(conf)))
    }

    fn name(&self) -> &'static str {
        "aggregate_from_array"
    }
}
