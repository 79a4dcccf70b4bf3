//! Meta-for-each transform
//!
//! Applies an inner transform list to each element of an array-valued
//! field, writing the rebuilt array to the target path. This is the
//! dedicated fan-out companion to
//! [`MetaPipeline`](super::MetaPipeline), which rejects array input in
//! object mode.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use sluice_message::{bytes_to_value, value_to_bytes, Message};
use tokio_util::sync::CancellationToken;

use crate::apply::apply;
use crate::config::{decode_settings, summarize, ObjectConfig, TransformConfig};
use crate::registry::{TransformerFactory, TransformerRegistry};
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "for_each_test.rs"]
mod tests;

/// Configuration for [`MetaForEach`]
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MetaForEachConfig {
    /// Stage identifier used in errors and logs
    pub id: String,

    /// Inner transforms applied to each array element
    pub transforms: Vec<TransformConfig>,

    /// `source_key` and `target_key` are both required
    pub object: ObjectConfig,
}

impl MetaForEachConfig {
    fn validate(&self) -> TransformResult<()> {
        if self.object.source_key.is_empty() {
            return Err(TransformError::validation(
                "object.source_key: missing required option",
            ));
        }
        if self.object.target_key.is_empty() {
            return Err(TransformError::validation(
                "object.target_key: missing required option",
            ));
        }
        if self.transforms.is_empty() {
            return Err(TransformError::validation("transforms: missing required option"));
        }

        Ok(())
    }
}

/// Applies inner transforms element-wise over an array field
pub struct MetaForEach {
    conf: MetaForEachConfig,
    id: String,

    transformers: Vec<Box<dyn Transformer>>,
}

impl MetaForEach {
    /// Build the transform from configuration, constructing the inner
    /// transforms through the registry.
    pub fn new(registry: &TransformerRegistry, mut conf: MetaForEachConfig) -> TransformResult<Self> {
        if conf.id.is_empty() {
            conf.id = "meta_for_each".to_string();
        }
        conf.validate()?;

        let transformers = registry.build_all(&conf.transforms)?;
        Ok(Self {
            id: conf.id.clone(),
            transformers,
            conf,
        })
    }

    async fn process(
        &self,
        cancel: &CancellationToken,
        mut msg: Message,
    ) -> TransformResult<Vec<Message>> {
        // Control traverses the inner transforms so nested buffering stages
        // observe the flush boundary.
        if msg.is_control() {
            return apply(cancel, &self.transformers, vec![msg]).await;
        }

        let value = match msg.get_value(&self.conf.object.source_key) {
            Some(value) => value,
            None => return Ok(vec![msg]),
        };
        let Value::Array(elements) = value else {
            return Ok(vec![msg]);
        };

        let mut rebuilt = Vec::with_capacity(elements.len());
        for element in elements {
            let synthetic = Message::from_payload(value_to_bytes(&element));
            let results = apply(cancel, &self.transformers, vec![synthetic]).await?;

            for result in results {
                if result.is_control() {
                    continue;
                }
                rebuilt.push(bytes_to_value(result.payload()));
            }
        }

        msg.set_value(&self.conf.object.target_key, Value::Array(rebuilt))?;
        Ok(vec![msg])
    }
}

impl Transformer for MetaForEach {
    fn transform<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = TransformResult<Vec<Message>>> + Send + 'a>> {
        Box::pin(self.process(cancel, msg))
    }

    fn name(&self) -> &'static str {
        "meta_for_each"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        summarize(&self.conf)
    }
}

/// Factory for [`MetaForEach`]
#[derive(Debug, Clone, Copy)]
pub struct ForEachFactory;

impl TransformerFactory for ForEachFactory {
    fn create(
        &self,
        registry: &TransformerRegistry,
        config: &TransformConfig,
    ) -> TransformResult<Box<dyn Transformer>> {
        let conf: MetaForEachConfig = decode_settings(&config.settings)?;
        Ok(Box::new(MetaForEach::new(registry, conf)?))
    }

    fn name(&self) -> &'static str {
        "meta_for_each"
    }
}
