// tests/subscribers.rs
// Scenario 8 (spec §8): a subscriber registered with `sub` observes every
// matching inbound call, once per call, independent of the action itself.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions are permitted.")]
#![allow(missing_docs, clippy::missing_docs_in_private_items, reason = "Integration tests are not part of the public API surface.")]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::json;

use actiongate::Instance;
use actiongate::runtime::subscription::Direction;

#[test]
fn subscriber_fires_once_per_matching_call() {
    let instance = Instance::new();
    instance
        .add(&[("role".to_string(), json!("x"))].into_iter().collect(), Arc::new(|_d, _m, done| done(Ok(json!({})))), None, "handler")
        .unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&seen);
    instance.sub(
        &[("role".to_string(), json!("x"))].into_iter().collect(),
        Direction::In,
        Arc::new(move |_direction, _meta, _payload| {
            counted.fetch_add(1, Ordering::SeqCst);
        }),
    );

    for _ in 0..2 {
        let (tx, rx) = mpsc::channel();
        instance.act([("role".to_string(), json!("x"))].into_iter().collect(), Box::new(move |result| {
            let _ = tx.send(result);
        }));
        rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
    }

    assert_eq!(seen.load(Ordering::SeqCst), 2, "subscriber must fire exactly once per outermost call");
}
