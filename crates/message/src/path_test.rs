//! Tests for dot-notation path access

use super::*;
use serde_json::json;

#[test]
fn test_get_object_path() {
    let root = json!({"a": {"b": {"c": 42}}});

    assert_eq!(get(&root, "a.b.c"), Some(&json!(42)));
    assert_eq!(get(&root, "a.b"), Some(&json!({"c": 42})));
    assert_eq!(get(&root, "a.x"), None);
}

#[test]
fn test_get_array_index() {
    let root = json!({"items": ["x", "y"]});

    assert_eq!(get(&root, "items.0"), Some(&json!("x")));
    assert_eq!(get(&root, "items.1"), Some(&json!("y")));
    assert_eq!(get(&root, "items.2"), None);
    // Non-numeric segment against an array resolves to nothing.
    assert_eq!(get(&root, "items.first"), None);
}

#[test]
fn test_get_through_scalar_fails() {
    let root = json!({"a": 1});

    assert_eq!(get(&root, "a.b"), None);
}

#[test]
fn test_get_empty_segment() {
    let root = json!({"a": 1});

    assert_eq!(get(&root, ""), None);
    assert_eq!(get(&root, "a."), None);
}

#[test]
fn test_set_creates_nested_objects() {
    let mut root = json!({});
    set(&mut root, "a.b.c", json!(1)).unwrap();

    assert_eq!(root, json!({"a": {"b": {"c": 1}}}));
}

#[test]
fn test_set_creates_array_for_numeric_segment() {
    let mut root = json!({});
    set(&mut root, "items.0", json!("x")).unwrap();
    set(&mut root, "items.2", json!("z")).unwrap();

    assert_eq!(root, json!({"items": ["x", null, "z"]}));
}

#[test]
fn test_set_replaces_scalar_in_path() {
    let mut root = json!({"a": 1});
    set(&mut root, "a.b", json!(2)).unwrap();

    assert_eq!(root, json!({"a": {"b": 2}}));
}

#[test]
fn test_set_overwrites_existing_value() {
    let mut root = json!({"a": {"b": 1}});
    set(&mut root, "a.b", json!([1, 2])).unwrap();

    assert_eq!(root, json!({"a": {"b": [1, 2]}}));
}

#[test]
fn test_set_rejects_empty_segment() {
    let mut root = json!({});

    assert!(set(&mut root, "a..b", json!(1)).is_err());
}

#[test]
fn test_delete_object_key() {
    let mut root = json!({"a": {"b": 1, "c": 2}});

    assert!(delete(&mut root, "a.b"));
    assert_eq!(root, json!({"a": {"c": 2}}));
    assert!(!delete(&mut root, "a.b"));
}

#[test]
fn test_delete_array_element() {
    let mut root = json!({"items": [1, 2, 3]});

    assert!(delete(&mut root, "items.1"));
    assert_eq!(root, json!({"items": [1, 3]}));
    assert!(!delete(&mut root, "items.9"));
}

#[test]
fn test_bytes_to_value_parses_json() {
    assert_eq!(bytes_to_value(br#"{"a":1}"#), json!({"a":1}));
    assert_eq!(bytes_to_value(b"[1,2]"), json!([1, 2]));
}

#[test]
fn test_bytes_to_value_keeps_text_as_string() {
    assert_eq!(bytes_to_value(b"hello"), json!("hello"));
}

#[test]
fn test_bytes_to_value_splices_scalars() {
    assert_eq!(bytes_to_value(b"42"), json!(42));
    assert_eq!(bytes_to_value(b"true"), json!(true));
    assert_eq!(bytes_to_value(br#""quoted""#), json!("quoted"));
}

#[test]
fn test_bytes_to_value_malformed_json_falls_back_to_string() {
    assert_eq!(bytes_to_value(b"{not json"), json!("{not json"));
}

#[test]
fn test_bytes_to_value_encodes_binary() {
    let value = bytes_to_value(&[0x00, 0xff]);
    assert!(value.is_string());
}

#[test]
fn test_value_to_bytes() {
    assert_eq!(value_to_bytes(&json!("raw")), b"raw".to_vec());
    assert_eq!(value_to_bytes(&json!({"a":1})), br#"{"a":1}"#.to_vec());
    assert_eq!(value_to_bytes(&json!(7)), b"7".to_vec());
}

#[test]
fn test_value_to_string() {
    assert_eq!(value_to_string(&json!("s")), "s");
    assert_eq!(value_to_string(&json!(null)), "");
    assert_eq!(value_to_string(&json!(3)), "3");
    assert_eq!(value_to_string(&json!({"a":1})), r#"{"a":1}"#);
}
