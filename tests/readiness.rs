// tests/readiness.rs
// spec §4.8/§4.9: `ready` fires once the gate is idle, and the option tree
// freezes from that first firing onward.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions are permitted.")]
#![allow(missing_docs, clippy::missing_docs_in_private_items, reason = "Integration tests are not part of the public API surface.")]

use std::sync::mpsc;
use std::time::Duration;

use actiongate::Instance;
use actiongate::OptionsPatch;
use actiongate::runtime::options::StrictOptions;

#[test]
fn ready_fires_when_the_gate_is_idle() {
    let instance = Instance::new();
    let (tx, rx) = mpsc::channel();
    instance.ready(Box::new(move || {
        let _ = tx.send(());
    }));
    rx.recv_timeout(Duration::from_secs(1)).unwrap();
}

#[test]
fn ready_fires_again_on_a_second_wait() {
    let instance = Instance::new();
    for _ in 0..2 {
        let (tx, rx) = mpsc::channel();
        instance.ready(Box::new(move || {
            let _ = tx.send(());
        }));
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
    }
}

#[test]
fn set_options_is_a_no_op_after_first_ready() {
    let instance = Instance::new();
    assert_eq!(instance.options().strict.maxloop, 11);

    let (tx, rx) = mpsc::channel();
    instance.ready(Box::new(move || {
        let _ = tx.send(());
    }));
    rx.recv_timeout(Duration::from_secs(1)).unwrap();

    instance.set_options(OptionsPatch { strict: Some(StrictOptions { maxloop: 99, ..StrictOptions::default() }), ..OptionsPatch::default() });

    assert_eq!(instance.options().strict.maxloop, 11, "options must stay frozen once the instance has reported ready");
}

#[test]
fn set_options_applies_before_first_ready() {
    let instance = Instance::new();
    instance.set_options(OptionsPatch { strict: Some(StrictOptions { maxloop: 3, ..StrictOptions::default() }), ..OptionsPatch::default() });
    assert_eq!(instance.options().strict.maxloop, 3);
}
