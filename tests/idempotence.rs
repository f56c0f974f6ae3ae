// tests/idempotence.rs
// Scenario 4 (spec §8): a repeated `id$` replays the cached outcome without
// re-invoking the handler.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions are permitted.")]
#![allow(missing_docs, clippy::missing_docs_in_private_items, reason = "Integration tests are not part of the public API surface.")]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::json;

use actiongate::Instance;

#[test]
fn repeated_actid_replays_cached_result_without_rerunning_handler() {
    let instance = Instance::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);

    instance
        .add(
            &[("role".to_string(), json!("r"))].into_iter().collect(),
            Arc::new(move |_d, m, done| {
                counted.fetch_add(1, Ordering::SeqCst);
                let a = m.get("a").cloned().unwrap_or(json!(null));
                done(Ok(json!({ "a": a })));
            }),
            None,
            "echo",
        )
        .unwrap();

    let message = || -> serde_json::Map<String, serde_json::Value> {
        [("role".to_string(), json!("r")), ("a".to_string(), json!(1)), ("id$".to_string(), json!("X/T"))].into_iter().collect()
    };

    let (tx1, rx1) = mpsc::channel();
    instance.act(message(), Box::new(move |result| { let _ = tx1.send(result); }));
    let first = rx1.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();

    let (tx2, rx2) = mpsc::channel();
    instance.act(message(), Box::new(move |result| { let _ = tx2.send(result); }));
    let second = rx2.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "handler must run exactly once across both calls");
}
