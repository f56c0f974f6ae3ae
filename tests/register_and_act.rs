// tests/register_and_act.rs
// Scenario 1 (spec §8): a freshly registered action answers a matching call.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions are permitted.")]
#![allow(missing_docs, clippy::missing_docs_in_private_items, reason = "Integration tests are not part of the public API surface.")]

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::json;

use actiongate::Instance;

#[test]
fn sum_action_answers_matching_message() {
    let instance = Instance::new();
    instance
        .add(
            &[("role".to_string(), json!("math")), ("cmd".to_string(), json!("sum"))].into_iter().collect(),
            Arc::new(|_this, msg, done| {
                let x = msg.get("x").and_then(serde_json::Value::as_i64).unwrap_or(0);
                let y = msg.get("y").and_then(serde_json::Value::as_i64).unwrap_or(0);
                done(Ok(json!({ "a": x + y })));
            }),
            None,
            "sum",
        )
        .expect("pattern has matchable keys");

    let (tx, rx) = mpsc::channel();
    instance.act(
        [("role".to_string(), json!("math")), ("cmd".to_string(), json!("sum")), ("x".to_string(), json!(2)), ("y".to_string(), json!(3))]
            .into_iter()
            .collect(),
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );

    let result = rx.recv_timeout(Duration::from_secs(2)).expect("call completed").expect("call succeeded");
    assert_eq!(result, json!({ "a": 5 }));
}
