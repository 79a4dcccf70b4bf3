use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use serde_json::json;

use super::*;
use crate::registry::default_registry;

/// Records every delivered payload; optionally fails the first few calls.
struct Recording {
    payloads: Arc<StdMutex<Vec<Vec<u8>>>>,
    failures: AtomicUsize,
}

impl Recording {
    fn new() -> (Self, Arc<StdMutex<Vec<Vec<u8>>>>) {
        let payloads = Arc::new(StdMutex::new(Vec::new()));
        (
            Self {
                payloads: Arc::clone(&payloads),
                failures: AtomicUsize::new(0),
            },
            payloads,
        )
    }

    fn failing_first(n: usize) -> (Self, Arc<StdMutex<Vec<Vec<u8>>>>) {
        let (mut invoke, payloads) = Self::new();
        invoke.failures = AtomicUsize::new(n);
        (invoke, payloads)
    }
}

impl Invoke for Recording {
    fn invoke<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        payload: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), InvokeError>> + Send + 'a>> {
        let result = if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            Err(InvokeError::unavailable("down"))
        } else {
            self.payloads
                .lock()
                .expect("payload lock")
                .push(payload.to_vec());
            Ok(())
        };
        Box::pin(async move { result })
    }
}

fn sink_with(conf: SendConfig, invoke: Recording) -> SendTransform {
    SendTransform::new("send_mock", &conf, Vec::new(), Box::new(invoke))
}

fn delivered(payloads: &StdMutex<Vec<Vec<u8>>>) -> Vec<String> {
    payloads
        .lock()
        .expect("payload lock")
        .iter()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .collect()
}

#[tokio::test]
async fn data_passes_through_and_control_flushes() {
    let (invoke, payloads) = Recording::new();
    let sink = sink_with(SendConfig::default(), invoke);
    let cancel = CancellationToken::new();

    let out = sink
        .transform(&cancel, Message::from_payload("x"))
        .await
        .expect("transform");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].payload(), b"x");
    assert!(delivered(&payloads).is_empty());

    let out = sink
        .transform(&cancel, Message::control())
        .await
        .expect("transform");
    assert_eq!(out.len(), 1);
    assert!(out[0].is_control());
    assert_eq!(delivered(&payloads), vec!["x"]);
}

#[tokio::test]
async fn control_flush_resets_state() {
    let (invoke, payloads) = Recording::new();
    let sink = sink_with(SendConfig::default(), invoke);
    let cancel = CancellationToken::new();

    sink.transform(&cancel, Message::from_payload("x"))
        .await
        .expect("transform");
    sink.transform(&cancel, Message::control())
        .await
        .expect("transform");
    sink.transform(&cancel, Message::control())
        .await
        .expect("transform");

    // The second control found nothing buffered.
    assert_eq!(delivered(&payloads), vec!["x"]);
}

#[tokio::test]
async fn count_overflow_flushes_then_retries() {
    let (invoke, payloads) = Recording::new();
    let sink = sink_with(
        SendConfig {
            batch: BatchConfig {
                count: 2,
                size: 0,
                duration: 0,
            },
            ..Default::default()
        },
        invoke,
    );
    let cancel = CancellationToken::new();

    for payload in ["a", "b"] {
        sink.transform(&cancel, Message::from_payload(payload))
            .await
            .expect("transform");
        assert!(delivered(&payloads).is_empty());
    }

    // The third message overflows: the open batch is delivered and the
    // message lands in a fresh window.
    sink.transform(&cancel, Message::from_payload("c"))
        .await
        .expect("transform");
    assert_eq!(delivered(&payloads), vec!["a", "b"]);

    sink.transform(&cancel, Message::control())
        .await
        .expect("transform");
    assert_eq!(delivered(&payloads), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn batch_key_separates_deliveries() {
    let (invoke, payloads) = Recording::new();
    let sink = sink_with(
        SendConfig {
            object: ObjectConfig {
                batch_key: "group".to_string(),
                ..Default::default()
            },
            ..Default::default()
        },
        invoke,
    );
    let cancel = CancellationToken::new();

    for payload in [r#"{"group":"x"}"#, r#"{"group":"y"}"#] {
        sink.transform(&cancel, Message::from_payload(payload))
            .await
            .expect("transform");
    }
    sink.transform(&cancel, Message::control())
        .await
        .expect("transform");

    let mut got = delivered(&payloads);
    got.sort();
    assert_eq!(got, vec![r#"{"group":"x"}"#, r#"{"group":"y"}"#]);
}

#[tokio::test]
async fn oversize_item_is_fatal() {
    let (invoke, _payloads) = Recording::new();
    let sink = sink_with(
        SendConfig {
            id: "my_sink".to_string(),
            batch: BatchConfig {
                count: 0,
                size: 2,
                duration: 0,
            },
            ..Default::default()
        },
        invoke,
    );
    let cancel = CancellationToken::new();

    let err = sink
        .transform(&cancel, Message::from_payload("hello"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransformError::BatchMisconfigured { ref id } if id == "my_sink"
    ));
}

#[tokio::test]
async fn auxiliary_transforms_shape_the_batch() {
    let registry = default_registry();
    let conf = SendConfig {
        auxiliary_transforms: vec![TransformConfig::with_settings(
            "aggregate_to_array",
            json!({"batch": {"count": 1000}}),
        )],
        ..Default::default()
    };
    let aux = registry
        .build_all(&conf.auxiliary_transforms)
        .expect("build aux");

    let (invoke, payloads) = Recording::new();
    let sink = SendTransform::new("send_mock", &conf, aux, Box::new(invoke));
    let cancel = CancellationToken::new();

    for payload in ["1", "2"] {
        sink.transform(&cancel, Message::from_payload(payload))
            .await
            .expect("transform");
    }
    sink.transform(&cancel, Message::control())
        .await
        .expect("transform");

    // Two buffered items become one array delivery.
    assert_eq!(delivered(&payloads), vec!["[1,2]"]);
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let (invoke, payloads) = Recording::failing_first(1);
    let sink = sink_with(
        SendConfig {
            retry: RetryConfig {
                attempts: 3,
                backoff_ms: 1,
                ..Default::default()
            },
            ..Default::default()
        },
        invoke,
    );
    let cancel = CancellationToken::new();

    sink.transform(&cancel, Message::from_payload("x"))
        .await
        .expect("transform");
    sink.transform(&cancel, Message::control())
        .await
        .expect("transform");

    assert_eq!(delivered(&payloads), vec!["x"]);
}

#[tokio::test]
async fn exhausted_retries_surface_as_invoke_error() {
    let (invoke, payloads) = Recording::failing_first(usize::MAX);
    let sink = sink_with(
        SendConfig {
            retry: RetryConfig {
                attempts: 2,
                backoff_ms: 1,
                ..Default::default()
            },
            ..Default::default()
        },
        invoke,
    );
    let cancel = CancellationToken::new();

    sink.transform(&cancel, Message::from_payload("x"))
        .await
        .expect("transform");
    let err = sink.transform(&cancel, Message::control()).await.unwrap_err();

    assert!(matches!(err, TransformError::Invoke(_)));
    assert!(delivered(&payloads).is_empty());
}

#[tokio::test]
async fn size_ceiling_rejects_single_message() {
    let (invoke, _payloads) = Recording::new();
    let sink = sink_with(SendConfig::default(), invoke);
    let cancel = CancellationToken::new();

    let oversized = vec![b'x'; SEND_SIZE_LIMIT + 1];
    let err = sink
        .transform(&cancel, Message::from_payload(oversized))
        .await
        .unwrap_err();
    assert!(matches!(err, TransformError::TransformFailed(_)));
}

#[tokio::test]
async fn configured_id_reported() {
    let (invoke, _payloads) = Recording::new();
    let sink = sink_with(
        SendConfig {
            id: "my_sink".to_string(),
            ..Default::default()
        },
        invoke,
    );

    assert_eq!(sink.id(), "my_sink");
    assert_eq!(sink.name(), "send_mock");
}
