//! Dot-notation path access over JSON values.
//!
//! Paths are `.`-separated segments; a segment addressing an array must be a
//! base-10 index. Setting a path creates missing intermediate containers,
//! choosing an array when the next segment is numeric and an object
//! otherwise.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::error::MessageError;

#[cfg(test)]
#[path = "path_test.rs"]
mod tests;

/// Resolve a path to a value, if it exists
pub(crate) fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }

        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Set a path to a value, creating intermediate containers as needed
pub(crate) fn set(root: &mut Value, path: &str, value: Value) -> Result<(), MessageError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(MessageError::InvalidPath(path.to_string()));
    }

    set_inner(root, &segments, value)
}

fn set_inner(current: &mut Value, segments: &[&str], value: Value) -> Result<(), MessageError> {
    let segment = segments[0];
    let last = segments.len() == 1;

    match current {
        Value::Object(map) => {
            if last {
                map.insert(segment.to_string(), value);
                return Ok(());
            }

            let next = map
                .entry(segment.to_string())
                .or_insert_with(|| implied_container(segments[1]));
            if !next.is_object() && !next.is_array() {
                *next = implied_container(segments[1]);
            }
            set_inner(next, &segments[1..], value)
        }
        Value::Array(items) => {
            let index = segment
                .parse::<usize>()
                .map_err(|_| MessageError::InvalidPath(segment.to_string()))?;
            while items.len() <= index {
                items.push(Value::Null);
            }

            if last {
                items[index] = value;
                return Ok(());
            }

            let next = &mut items[index];
            if !next.is_object() && !next.is_array() {
                *next = implied_container(segments[1]);
            }
            set_inner(next, &segments[1..], value)
        }
        other => {
            // Scalar in the way of a deeper path; replace it with the
            // container the remaining segments require.
            *other = implied_container(segment);
            set_inner(other, segments, value)
        }
    }
}

/// Remove a path, returning whether a value was removed
pub(crate) fn delete(root: &mut Value, path: &str) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return false;
    }

    delete_inner(root, &segments)
}

fn delete_inner(current: &mut Value, segments: &[&str]) -> bool {
    let segment = segments[0];

    if segments.len() == 1 {
        return match current {
            Value::Object(map) => map.remove(segment).is_some(),
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(index) if index < items.len() => {
                    items.remove(index);
                    true
                }
                _ => false,
            },
            _ => false,
        };
    }

    match current {
        Value::Object(map) => map
            .get_mut(segment)
            .is_some_and(|next| delete_inner(next, &segments[1..])),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get_mut(index))
            .is_some_and(|next| delete_inner(next, &segments[1..])),
        _ => false,
    }
}

fn implied_container(segment: &str) -> Value {
    if segment.parse::<usize>().is_ok() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Interpret raw bytes as a JSON value.
///
/// Valid JSON text is parsed and spliced in whole, scalars included; other
/// UTF-8 bytes become a string; binary data is base64-encoded.
pub fn bytes_to_value(bytes: &[u8]) -> Value {
    if !bytes.is_empty() {
        if let Ok(value) = serde_json::from_slice(bytes) {
            return value;
        }
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::String(BASE64.encode(bytes)),
    }
}

/// Render a JSON value as payload bytes.
///
/// Strings yield their raw contents (no surrounding quotes); everything else
/// is serialized as JSON text.
pub fn value_to_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::String(text) => text.clone().into_bytes(),
        other => serde_json::to_vec(other).unwrap_or_default(),
    }
}

/// Render a JSON value as a plain string, the way a batch key is derived.
///
/// Strings yield their contents, null yields the empty string, and other
/// values their JSON text.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
