// tests/loop_guard.rs
// Scenario 5 (spec §8): history$ depth beyond strict.maxloop fails with act_loop.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions are permitted.")]
#![allow(missing_docs, clippy::missing_docs_in_private_items, reason = "Integration tests are not part of the public API surface.")]

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::json;

use actiongate::Instance;

#[test]
fn history_beyond_maxloop_fails_with_act_loop() {
    let instance = Instance::new();
    instance
        .add(&[("role".to_string(), json!("r")), ("a".to_string(), json!(1))].into_iter().collect(), Arc::new(|_d, _m, done| done(Ok(json!({})))), None, "handler")
        .unwrap();

    let action = instance.find(&[("role".to_string(), json!("r")), ("a".to_string(), json!(1))].into_iter().collect()).expect("registered");
    let id = action.meta.id.to_string();

    let history: Vec<serde_json::Value> = (0..12).map(|_| json!({ "action": id.clone() })).collect();

    let (tx, rx) = mpsc::channel();
    instance.act(
        [("role".to_string(), json!("r")), ("a".to_string(), json!(1)), ("history$".to_string(), json!(history))].into_iter().collect(),
        Box::new(move |result| { let _ = tx.send(result); }),
    );

    let err = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap_err();
    assert_eq!(err.kind.code(), "act_loop");
}
