//! Transformer Registry - Dynamic transformer creation
//!
//! The registry maps transformer type tags to factory implementations,
//! enabling configuration-driven pipeline construction. Factories receive
//! the registry itself so composite transforms (meta pipelines, batching
//! sinks with auxiliary transforms) recurse through the same construction
//! path as top-level stages.

use std::collections::HashMap;

use crate::config::TransformConfig;
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Factory trait for creating transformers
///
/// Implement this trait to register custom transformers with the registry.
pub trait TransformerFactory: Send + Sync {
    /// Create a transformer instance from a stage configuration.
    ///
    /// # Errors
    /// Returns [`TransformError::Config`] or [`TransformError::Validation`]
    /// if the settings are invalid. Construction fails fast; a pipeline is
    /// never partially built.
    fn create(
        &self,
        registry: &TransformerRegistry,
        config: &TransformConfig,
    ) -> TransformResult<Box<dyn Transformer>>;

    /// The type tag this factory is registered under
    fn name(&self) -> &'static str;
}

/// Registry of transformer factories, keyed by type tag
pub struct TransformerRegistry {
    factories: HashMap<String, Box<dyn TransformerFactory>>,
}

impl TransformerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a transformer factory.
    ///
    /// # Panics
    /// Panics if a factory is already registered under this tag; registries
    /// are assembled once at startup, so a duplicate is a programming error.
    pub fn register<F: TransformerFactory + 'static>(&mut self, type_tag: &str, factory: F) {
        if self.factories.contains_key(type_tag) {
            panic!("transformer factory '{}' already registered", type_tag);
        }
        self.factories
            .insert(type_tag.to_string(), Box::new(factory));
    }

    /// Build a single transformer from its stage configuration.
    ///
    /// # Errors
    /// [`TransformError::Config`] if the type tag is not registered or the
    /// factory rejects the settings.
    pub fn build(&self, config: &TransformConfig) -> TransformResult<Box<dyn Transformer>> {
        let factory = self.factories.get(&config.kind).ok_or_else(|| {
            TransformError::config(format!(
                "unknown transformer type '{}', available: [{}]",
                config.kind,
                self.available_types().join(", ")
            ))
        })?;

        tracing::debug!(kind = %config.kind, "building transformer");
        factory.create(self, config)
    }

    /// Build an ordered pipeline from a list of stage configurations
    pub fn build_all(
        &self,
        configs: &[TransformConfig],
    ) -> TransformResult<Vec<Box<dyn Transformer>>> {
        configs.iter().map(|cfg| self.build(cfg)).collect()
    }

    /// Check if a type tag is registered
    pub fn contains(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }

    /// Registered type tags, sorted for stable error messages
    pub fn available_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with all built-in transformers registered
///
/// Includes:
/// - `noop` - Pass-through transformer
/// - `meta_pipeline` - Nested transform list, whole-message or object mode
/// - `meta_for_each` - Apply transforms to each element of an array
/// - `aggregate_to_array` - Windowed batching into a JSON array
/// - `aggregate_to_string` - Windowed batching joined by a separator
/// - `aggregate_from_array` - Fan an array out into one message per element
/// - `send_stdout` - Batching sink writing to standard output
/// - `send_file` - Batching sink appending to a file
pub fn default_registry() -> TransformerRegistry {
    let mut registry = TransformerRegistry::new();
    registry.register("noop", crate::noop::NoopFactory);
    registry.register("meta_pipeline", crate::meta::PipelineFactory);
    registry.register("meta_for_each", crate::meta::ForEachFactory);
    registry.register("aggregate_to_array", crate::aggregate::ToArrayFactory);
    registry.register("aggregate_to_string", crate::aggregate::ToStringFactory);
    registry.register("aggregate_from_array", crate::aggregate::FromArrayFactory);
    registry.register("send_stdout", crate::send::StdoutFactory);
    registry.register("send_file", crate::send::FileFactory);
    registry
}
