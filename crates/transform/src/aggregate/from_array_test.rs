use serde_json::json;
use sluice_message::Message;
use tokio_util::sync::CancellationToken;

use super::*;

fn transform_with(object: ObjectConfig) -> AggregateFromArray {
    AggregateFromArray::new(AggregateFromArrayConfig {
        id: String::new(),
        object,
    })
}

#[tokio::test]
async fn fans_whole_payload_array_out() {
    let fan = transform_with(ObjectConfig::default());
    let cancel = CancellationToken::new();

    let out = fan
        .transform(&cancel, Message::from_payload(r#"["a",{"b":1}]"#))
        .await
        .expect("transform");

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].payload(), b"a");
    assert_eq!(out[1].payload(), br#"{"b":1}"#);
}

#[tokio::test]
async fn reads_array_from_source_key() {
    let fan = transform_with(ObjectConfig {
        source_key: "items".to_string(),
        ..Default::default()
    });
    let cancel = CancellationToken::new();

    let out = fan
        .transform(&cancel, Message::from_payload(r#"{"items":[1,2]}"#))
        .await
        .expect("transform");

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].payload(), b"1");
    assert_eq!(out[1].payload(), b"2");
}

#[tokio::test]
async fn writes_elements_under_target_key() {
    let fan = transform_with(ObjectConfig {
        source_key: "items".to_string(),
        target_key: "v".to_string(),
        ..Default::default()
    });
    let cancel = CancellationToken::new();

    let out = fan
        .transform(&cancel, Message::from_payload(r#"{"items":[1,2]}"#))
        .await
        .expect("transform");

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].get_value("v"), Some(json!(1)));
    assert_eq!(out[1].get_value("v"), Some(json!(2)));
}

#[tokio::test]
async fn non_array_passes_through() {
    let fan = transform_with(ObjectConfig::default());
    let cancel = CancellationToken::new();

    let out = fan
        .transform(&cancel, Message::from_payload(r#"{"a":1}"#))
        .await
        .expect("transform");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].payload(), br#"{"a":1}"#);
}

#[tokio::test]
async fn missing_source_passes_through() {
    let fan = transform_with(ObjectConfig {
        source_key: "absent".to_string(),
        ..Default::default()
    });
    let cancel = CancellationToken::new();

    let out = fan
        .transform(&cancel, Message::from_payload(r#"{"a":1}"#))
        .await
        .expect("transform");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].payload(), br#"{"a":1}"#);
}

#[tokio::test]
async fn metadata_copied_to_every_element() {
    let fan = transform_with(ObjectConfig::default());
    let cancel = CancellationToken::new();

    let mut msg = Message::from_payload(r#"[1,2]"#);
    msg.metadata_mut().insert("origin", json!("upstream"));

    let out = fan.transform(&cancel, msg).await.expect("transform");
    assert_eq!(out.len(), 2);
    for element in &out {
        assert_eq!(element.metadata().get("origin"), Some(&json!("upstream")));
    }
}

#[tokio::test]
async fn metadata_does_not_alias_between_elements() {
    let fan = transform_with(ObjectConfig::default());
    let cancel = CancellationToken::new();

    let mut out = fan
        .transform(&cancel, Message::from_payload(r#"[1,2]"#))
        .await
        .expect("transform");

    out[0].metadata_mut().insert("only_first", json!(true));
    assert!(out[1].metadata().get("only_first").is_none());
}

#[tokio::test]
async fn empty_array_terminates_the_branch() {
    let fan = transform_with(ObjectConfig::default());
    let cancel = CancellationToken::new();

    let out = fan
        .transform(&cancel, Message::from_payload("[]"))
        .await
        .expect("transform");
    assert!(out.is_empty());
}

#[tokio::test]
async fn control_passes_through() {
    let fan = transform_with(ObjectConfig::default());
    let cancel = CancellationToken::new();

    let out = fan
        .transform(&cancel, Message::control())
        .await
        .expect("transform");
    assert_eq!(out.len(), 1);
    assert!(out[0].is_control());
}
