// tests/prior_chain.rs
// Scenario 3 (spec §8): `this.prior(msg, done)` re-enters the overridden action.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions are permitted.")]
#![allow(missing_docs, clippy::missing_docs_in_private_items, reason = "Integration tests are not part of the public API surface.")]

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;

use actiongate::Instance;

fn attrs(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

#[test]
fn override_observes_prior_result() {
    let instance = Instance::new();

    instance
        .add(&attrs(&[("role", json!("greet"))]), Arc::new(|_d, _m, done| done(Ok(json!({ "text": "hello" })))), None, "greet_a")
        .unwrap();

    instance
        .add(
            &attrs(&[("role", json!("greet"))]),
            Arc::new(|delegate, msg, done| {
                delegate.prior(
                    msg.as_map().clone(),
                    Box::new(move |prior_result| {
                        let base = prior_result.and_then(|v| v.get("text").and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
                            actiongate::ActError::new(actiongate::ErrorKind::ActExecute, "prior result missing text")
                        }));
                        match base {
                            Ok(text) => done(Ok(json!({ "text": format!("{text}, world") }))),
                            Err(err) => done(Err(err)),
                        }
                    }),
                );
            }),
            None,
            "greet_b",
        )
        .unwrap();

    let (tx, rx) = mpsc::channel();
    instance.act(attrs(&[("role", json!("greet"))]), Box::new(move |result| { let _ = tx.send(result); }));

    let result = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
    assert_eq!(result, json!({ "text": "hello, world" }));
}
