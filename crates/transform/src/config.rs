//! Shared configuration types
//!
//! A pipeline is configured as an ordered list of `{ "type": tag,
//! "settings": {...} }` entries. Factories decode the settings object into
//! their own typed config struct; the shared pieces (batch bounds, object
//! path addressing) live here so every aggregation-bearing stage recognizes
//! the same options.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{TransformError, TransformResult};

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

/// One stage in a configured pipeline: a type tag selecting the factory,
/// plus that stage's settings object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Registered transformer type (e.g. "aggregate_to_array")
    #[serde(rename = "type")]
    pub kind: String,

    /// Stage-specific settings, decoded by the selected factory
    #[serde(default)]
    pub settings: Value,
}

impl TransformConfig {
    /// Create a config with no settings
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            settings: Value::Null,
        }
    }

    /// Create a config with a settings object
    pub fn with_settings(kind: impl Into<String>, settings: Value) -> Self {
        Self {
            kind: kind.into(),
            settings,
        }
    }
}

/// Batch bounds for aggregation-bearing stages.
///
/// Any bound configured ≤ 1 falls back to its default: 1000 items, 1 MiB,
/// 300 seconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum items per batch
    pub count: usize,

    /// Maximum batch size in bytes
    pub size: usize,

    /// Maximum age of an open batch window, in seconds
    pub duration: u64,
}

/// Structured-path addressing shared by object-aware stages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    /// Path the stage reads its input value from
    pub source_key: String,

    /// Path the stage writes its output value to
    pub target_key: String,

    /// Path the aggregation key is derived from; empty batches everything
    /// under one global key
    pub batch_key: String,
}

/// Decode a settings object into a typed config.
///
/// Missing settings decode to the type's defaults; malformed settings are a
/// construction-time [`TransformError::Config`].
pub(crate) fn decode_settings<T>(settings: &Value) -> TransformResult<T>
where
    T: DeserializeOwned + Default,
{
    if settings.is_null() {
        return Ok(T::default());
    }

    serde_json::from_value(settings.clone())
        .map_err(|err| TransformError::config(err.to_string()))
}

/// Re-serialize a decoded config for introspection and logging
pub(crate) fn summarize<T: Serialize>(config: &T) -> String {
    serde_json::to_string(config).unwrap_or_else(|_| "{}".to_string())
}
