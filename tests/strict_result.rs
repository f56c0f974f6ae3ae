// tests/strict_result.rs
// spec §4.5 step 5 / §7: a success result that is not an object, array, or
// null is rejected as `result_not_objarr` when `strict.result` is on (the
// default); turning it off lets any success value through unchanged.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions are permitted.")]
#![allow(missing_docs, clippy::missing_docs_in_private_items, reason = "Integration tests are not part of the public API surface.")]

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::json;

use actiongate::Instance;
use actiongate::OptionsPatch;
use actiongate::runtime::options::StrictOptions;

fn register_scalar_result(instance: &Instance) {
    instance
        .add(
            &[("role".to_string(), json!("x"))].into_iter().collect(),
            Arc::new(|_d, _m, done| done(Ok(json!("not an object or array")))),
            None,
            "scalar",
        )
        .unwrap();
}

#[test]
fn scalar_success_result_is_rejected_by_default() {
    let instance = Instance::new();
    register_scalar_result(&instance);

    let (tx, rx) = mpsc::channel();
    instance.act([("role".to_string(), json!("x"))].into_iter().collect(), Box::new(move |result| {
        let _ = tx.send(result);
    }));

    let err = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap_err();
    assert_eq!(err.kind.code(), "result_not_objarr");
}

#[test]
fn scalar_success_result_passes_when_strict_result_is_off() {
    let instance = Instance::new();
    instance.set_options(OptionsPatch { strict: Some(StrictOptions { result: false, ..StrictOptions::default() }), ..OptionsPatch::default() });
    register_scalar_result(&instance);

    let (tx, rx) = mpsc::channel();
    instance.act([("role".to_string(), json!("x"))].into_iter().collect(), Box::new(move |result| {
        let _ = tx.send(result);
    }));

    let result = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
    assert_eq!(result, json!("not an object or array"));
}

#[test]
fn null_success_result_is_always_accepted() {
    let instance = Instance::new();
    instance
        .add(&[("role".to_string(), json!("y"))].into_iter().collect(), Arc::new(|_d, _m, done| done(Ok(json!(null)))), None, "nullish")
        .unwrap();

    let (tx, rx) = mpsc::channel();
    instance.act([("role".to_string(), json!("y"))].into_iter().collect(), Box::new(move |result| {
        let _ = tx.send(result);
    }));

    let result = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
    assert!(result.is_null());
}
