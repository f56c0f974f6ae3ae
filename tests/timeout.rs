// tests/timeout.rs
// Scenario 7 (spec §8): a handler that never calls its continuation produces
// exactly one TIMEOUT error after timeout$ elapses.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions are permitted.")]
#![allow(missing_docs, clippy::missing_docs_in_private_items, reason = "Integration tests are not part of the public API surface.")]

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::json;

use actiongate::Instance;

#[test]
fn handler_that_never_completes_times_out() {
    let instance = Instance::new();
    instance
        .add(
            &[("role".to_string(), json!("hangs"))].into_iter().collect(),
            Arc::new(|_d, _m, _done| {
                // Intentionally never calls `_done`.
            }),
            None,
            "hangs",
        )
        .unwrap();

    let (tx, rx) = mpsc::channel();
    instance.act(
        [("role".to_string(), json!("hangs")), ("timeout$".to_string(), json!(50))].into_iter().collect(),
        Box::new(move |result| { let _ = tx.send(result); }),
    );

    let err = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap_err();
    assert_eq!(err.kind.code(), "TIMEOUT");

    // The gate must have moved on: a second, independent call still completes.
    instance
        .add(
            &[("role".to_string(), json!("ok"))].into_iter().collect(),
            Arc::new(|_d, _m, done| done(Ok(json!({})))),
            None,
            "ok",
        )
        .unwrap();
    let (tx2, rx2) = mpsc::channel();
    instance.act([("role".to_string(), json!("ok"))].into_iter().collect(), Box::new(move |result| { let _ = tx2.send(result); }));
    rx2.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
}
