//! The pipeline message and its metadata sidecar.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessageError;
use crate::path;

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

/// Key-value sidecar attached to every message.
///
/// Metadata is always owned by the message carrying it. Fan-out clones the
/// whole map so that sibling messages never alias each other's state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    /// Create an empty metadata map
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert a value under `key`, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Remove the value stored under `key`
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether the map holds no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over all entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// The atomic unit of pipeline data.
///
/// Every stage must handle both variants: data messages carry the payload
/// being transformed, control messages signal that no more data will arrive
/// and buffered state must be flushed. Control is a distinguished variant,
/// not an empty payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Ordinary data flowing through the pipeline
    Data {
        /// Opaque byte payload; JSON text enables structured access
        payload: Vec<u8>,
        /// Sidecar describing the payload
        metadata: Metadata,
    },

    /// End-of-stream sentinel; carries no payload
    Control {
        /// Sidecar, preserved so flush boundaries can be annotated
        metadata: Metadata,
    },
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// Create an empty data message
    pub fn new() -> Self {
        Self::Data {
            payload: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Create a data message from a payload
    pub fn from_payload(payload: impl Into<Vec<u8>>) -> Self {
        Self::Data {
            payload: payload.into(),
            metadata: Metadata::new(),
        }
    }

    /// Create a control message
    pub fn control() -> Self {
        Self::Control {
            metadata: Metadata::new(),
        }
    }

    /// Whether this is a control message
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Control { .. })
    }

    /// The raw payload; empty for control messages
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Data { payload, .. } => payload,
            Self::Control { .. } => &[],
        }
    }

    /// Replace the payload. No-op on control messages, which never carry data.
    pub fn set_payload(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        if let Self::Data { payload, .. } = self {
            *payload = bytes.into();
        }
        self
    }

    /// Consume the message, returning its payload
    pub fn into_payload(self) -> Vec<u8> {
        match self {
            Self::Data { payload, .. } => payload,
            Self::Control { .. } => Vec::new(),
        }
    }

    /// The metadata sidecar
    pub fn metadata(&self) -> &Metadata {
        match self {
            Self::Data { metadata, .. } | Self::Control { metadata } => metadata,
        }
    }

    /// Mutable access to the metadata sidecar
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            Self::Data { metadata, .. } | Self::Control { metadata } => metadata,
        }
    }

    /// Replace the metadata sidecar
    pub fn set_metadata(&mut self, metadata: Metadata) -> &mut Self {
        *self.metadata_mut() = metadata;
        self
    }

    /// Read the value at a dot-notation path in the payload.
    ///
    /// Returns `None` when the path does not exist, when the payload is not
    /// JSON text, or on a control message. Absence is an ordinary outcome,
    /// never an error.
    pub fn get_value(&self, path: &str) -> Option<Value> {
        let Self::Data { payload, .. } = self else {
            return None;
        };

        let root: Value = serde_json::from_slice(payload).ok()?;
        path::get(&root, path).cloned()
    }

    /// Set the value at a dot-notation path in the payload.
    ///
    /// An empty payload starts from `{}`; intermediate objects and arrays are
    /// created as needed. A non-empty payload that is not JSON text fails
    /// with [`MessageError::NotJson`]. No-op on control messages.
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<(), MessageError> {
        let Self::Data { payload, .. } = self else {
            return Ok(());
        };

        let mut root = parse_or_empty(payload)?;
        path::set(&mut root, path, value)?;
        *payload = serialize(&root)?;
        Ok(())
    }

    /// Set the value at a path from raw bytes.
    ///
    /// Valid JSON text is spliced in as-is, other UTF-8 bytes become a JSON
    /// string, and arbitrary binary is base64-encoded first.
    pub fn set_raw(&mut self, path: &str, bytes: &[u8]) -> Result<(), MessageError> {
        self.set_value(path, path::bytes_to_value(bytes))
    }

    /// Delete the value at a dot-notation path in the payload.
    ///
    /// Returns whether a value was removed. No-op on control messages and
    /// empty payloads.
    pub fn delete_value(&mut self, path: &str) -> Result<bool, MessageError> {
        let Self::Data { payload, .. } = self else {
            return Ok(false);
        };
        if payload.is_empty() {
            return Ok(false);
        }

        let mut root: Value = serde_json::from_slice(payload).map_err(|_| MessageError::NotJson)?;
        let removed = path::delete(&mut root, path);
        if removed {
            *payload = serialize(&root)?;
        }
        Ok(removed)
    }
}

fn parse_or_empty(payload: &[u8]) -> Result<Value, MessageError> {
    if payload.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    serde_json::from_slice(payload).map_err(|_| MessageError::NotJson)
}

fn serialize(root: &Value) -> Result<Vec<u8>, MessageError> {
    serde_json::to_vec(root).map_err(|err| MessageError::Serialize(err.to_string()))
}
