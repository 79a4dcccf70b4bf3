use serde_json::json;

use super::*;
use crate::noop::NoopFactory;

#[test]
fn default_registry_has_all_builtins() {
    let registry = default_registry();

    for tag in [
        "noop",
        "meta_pipeline",
        "meta_for_each",
        "aggregate_to_array",
        "aggregate_to_string",
        "aggregate_from_array",
        "send_stdout",
        "send_file",
    ] {
        assert!(registry.contains(tag), "missing builtin '{tag}'");
    }
    assert_eq!(registry.len(), 8);
}

#[test]
fn build_known_type() {
    let registry = default_registry();
    let transformer = registry
        .build(&TransformConfig::new("noop"))
        .expect("build noop");
    assert_eq!(transformer.name(), "noop");
}

#[test]
fn unknown_type_lists_available() {
    let registry = default_registry();
    let err = registry.build(&TransformConfig::new("nope")).unwrap_err();

    let text = err.to_string();
    assert!(text.contains("unknown transformer type 'nope'"));
    assert!(text.contains("noop"));
}

#[test]
fn build_all_fails_fast() {
    let registry = default_registry();
    let configs = vec![TransformConfig::new("noop"), TransformConfig::new("nope")];

    assert!(registry.build_all(&configs).is_err());
}

#[test]
fn build_all_preserves_order() {
    let registry = default_registry();
    let configs = vec![
        TransformConfig::new("noop"),
        TransformConfig::with_settings(
            "aggregate_to_array",
            json!({"batch": {"count": 2}}),
        ),
    ];

    let pipeline = registry.build_all(&configs).expect("build pipeline");
    assert_eq!(pipeline.len(), 2);
    assert_eq!(pipeline[0].name(), "noop");
    assert_eq!(pipeline[1].name(), "aggregate_to_array");
}

#[test]
fn available_types_sorted() {
    let registry = default_registry();
    let types = registry.available_types();

    let mut sorted = types.clone();
    sorted.sort_unstable();
    assert_eq!(types, sorted);
}

#[test]
#[should_panic(expected = "already registered")]
fn duplicate_registration_panics() {
    let mut registry = TransformerRegistry::new();
    registry.register("noop", NoopFactory);
    registry.register("noop", NoopFactory);
}

#[test]
fn empty_registry() {
    let registry = TransformerRegistry::new();
    assert!(registry.is_empty());
    assert!(!registry.contains("noop"));
}
