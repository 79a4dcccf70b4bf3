//! Meta-pipeline transform
//!
//! A pipeline packaged as a single transformer. Two modes:
//!
//! - Whole-message mode (no object keys configured): the inner pipeline
//!   runs on the entire message, control and data alike.
//! - Object mode (`object.source_key` and `object.target_key` both set):
//!   the inner pipeline runs on the value at the source path, and each
//!   resulting payload is written back into a copy of the original message
//!   at the target path.
//!
//! Control messages always run through the full inner pipeline so nested
//! buffering stages still receive the flush signal.

use std::future::Future;
use std::pin::Pin;

use sluice_message::{value_to_bytes, Message};
use tokio_util::sync::CancellationToken;

use crate::apply::apply;
use crate::config::{decode_settings, summarize, ObjectConfig, TransformConfig};
use crate::registry::{TransformerFactory, TransformerRegistry};
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;

/// Configuration for [`MetaPipeline`]
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MetaPipelineConfig {
    /// Stage identifier used in errors and logs
    pub id: String,

    /// Inner transforms applied in series
    pub transforms: Vec<TransformConfig>,

    /// Optional object addressing; `source_key` and `target_key` must be
    /// set together
    pub object: ObjectConfig,
}

impl MetaPipelineConfig {
    fn validate(&self) -> TransformResult<()> {
        if self.transforms.is_empty() {
            return Err(TransformError::validation("transforms: missing required option"));
        }

        let source = !self.object.source_key.is_empty();
        let target = !self.object.target_key.is_empty();
        if source != target {
            return Err(TransformError::validation(
                "object.source_key and object.target_key must be set together",
            ));
        }

        Ok(())
    }
}

/// An ordered transform list packaged as one transformer
#[derive(Debug)]
pub struct MetaPipeline {
    conf: MetaPipelineConfig,
    id: String,
    object_mode: bool,

    transformers: Vec<Box<dyn Transformer>>,
}

impl MetaPipeline {
    /// Build the meta-pipeline from configuration, constructing the inner
    /// transforms through the registry.
    pub fn new(registry: &TransformerRegistry, mut conf: MetaPipelineConfig) -> TransformResult<Self> {
        if conf.id.is_empty() {
            conf.id = "meta_pipeline".to_string();
        }
        conf.validate()?;

        let transformers = registry.build_all(&conf.transforms)?;
        Ok(Self {
            id: conf.id.clone(),
            object_mode: !conf.object.source_key.is_empty(),
            transformers,
            conf,
        })
    }

    /// Package an already-built transform list as a whole-message pipeline.
    ///
    /// Useful for embedders composing pipelines programmatically.
    pub fn from_parts(id: impl Into<String>, transformers: Vec<Box<dyn Transformer>>) -> Self {
        Self {
            conf: MetaPipelineConfig::default(),
            id: id.into(),
            object_mode: false,
            transformers,
        }
    }

    async fn process(
        &self,
        cancel: &CancellationToken,
        msg: Message,
    ) -> TransformResult<Vec<Message>> {
        // Control always traverses the inner pipeline so nested buffering
        // stages observe the flush boundary.
        if msg.is_control() || !self.object_mode {
            return apply(cancel, &self.transformers, vec![msg]).await;
        }

        let value = match msg.get_value(&self.conf.object.source_key) {
            Some(value) => value,
            None => return Ok(vec![msg]),
        };

        if value.is_array() {
            // Arrays must be fanned out by meta_for_each before nesting.
            return Err(TransformError::failed(format!(
                "key {}: input is an array",
                self.conf.object.source_key
            )));
        }

        let synthetic = Message::from_payload(value_to_bytes(&value));
        let results = apply(cancel, &self.transformers, vec![synthetic]).await?;

        let mut output = Vec::with_capacity(results.len());
        for result in results {
            if result.is_control() {
                continue;
            }

            let mut out = msg.clone();
            out.set_raw(&self.conf.object.target_key, result.payload())?;
            output.push(out);
        }

        Ok(output)
    }
}

impl Transformer for MetaPipeline {
    fn transform<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = TransformResult<Vec<Message>>> + Send + 'a>> {
        Box::pin(self.process(cancel, msg))
    }

    fn name(&self) -> &'static str {
        "meta_pipeline"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        summarize(&self.conf)
    }
}

/// Factory for [`MetaPipeline`]
#[derive(Debug, Clone, Copy)]
pub struct PipelineFactory;

impl TransformerFactory for PipelineFactory {
    fn create(
        &self,
        registry: &TransformerRegistry,
        config: &TransformConfig,
    ) -> TransformResult<Box<dyn Transformer>> {
        let conf: MetaPipelineConfig = decode_settings(&config.settings)?;
        Ok(Box::new(MetaPipeline::new(registry, conf)?))
    }

    fn name(&self) -> &'static str {
        "meta_pipeline"
    }
}
