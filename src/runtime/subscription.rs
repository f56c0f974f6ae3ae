// src/runtime/subscription.rs
// ============================================================================
// Module: Actiongate Subscription Bus (C7)
// Description: Fan-out of act-in/act-out observers by pattern.
// Purpose: Let callers observe dispatches without participating in routing.
// Dependencies: std::sync, crate::core, crate::runtime::pattern_index
// ============================================================================

//! ## Overview
//! `sub(pattern, fn)` registers an observer against a [`PatternIndex`]
//! exactly like an action, but subscribers never compete for the
//! most-specific match: every registered subscriber whose pattern matches
//! the message fires, independently of the others. Subscribers only fire
//! at `entry == true` (spec §4.7) and exceptions never reach the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Map;
use serde_json::Value;

use crate::core::CallMeta;
use crate::core::Pattern;

// ============================================================================
// SECTION: Subscriber Direction
// ============================================================================

/// Which phase(s) of a dispatch a subscriber observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Fires on `act-in` only.
    In,
    /// Fires on `act-out`/`act-err` only.
    Out,
    /// Fires on both phases.
    Both,
}

/// A registered observer function. Receives the matched phase, the call
/// metadata, and the message payload (the inbound message for `act-in`, the
/// result/error value for `act-out`/`act-err`).
pub type SubscriberFn = Arc<dyn Fn(Direction, &CallMeta, &Value) + Send + Sync>;

struct Subscriber {
    /// Pattern this subscriber observes.
    pattern: Pattern,
    /// Phase(s) it fires on.
    direction: Direction,
    /// The observer callback.
    handler: SubscriberFn,
}

// ============================================================================
// SECTION: Subscription Bus
// ============================================================================

/// Holds every registered subscriber and dispatches matching ones.
#[derive(Default)]
pub struct SubscriptionBus {
    /// Whether subscriber patterns support `*`/`?` wildcards.
    glob: bool,
    /// Registered subscribers, in registration order.
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SubscriptionBus {
    /// Creates an empty bus. `glob` must match the instance's pattern mode.
    #[must_use]
    pub fn new(glob: bool) -> Self {
        Self { glob, subscribers: Mutex::new(Vec::new()) }
    }

    /// Registers `handler` to observe dispatches matching `pattern`.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    pub fn sub(&self, pattern: Pattern, direction: Direction, handler: SubscriberFn) {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Subscriber { pattern, direction, handler });
    }

    /// Notifies every matching subscriber of an `act-in`. A no-op unless
    /// `meta.entry` is `true` (inner `prior` calls never re-notify).
    pub fn notify_in(&self, meta: &CallMeta, attrs: &Map<String, Value>) {
        self.notify(Direction::In, meta, attrs, &Value::Object(attrs.clone()));
    }

    /// Notifies every matching subscriber of an `act-out`/`act-err`.
    pub fn notify_out(&self, meta: &CallMeta, attrs: &Map<String, Value>, payload: &Value) {
        self.notify(Direction::Out, meta, attrs, payload);
    }

    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    fn notify(&self, phase: Direction, meta: &CallMeta, attrs: &Map<String, Value>, payload: &Value) {
        if !meta.entry {
            return;
        }
        let subscribers = self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for subscriber in subscribers.iter() {
            let fires = match subscriber.direction {
                Direction::Both => true,
                other => other == phase,
            };
            if !fires || !subscriber.pattern.matches(attrs, self.glob) {
                continue;
            }
            let handler = Arc::clone(&subscriber.handler);
            let result = catch_unwind(AssertUnwindSafe(|| handler(phase, meta, payload)));
            if result.is_err() {
                tracing::warn!(actid = %meta.id, "subscriber panicked; isolated from caller");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions are permitted.")]

    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::Direction;
    use super::SubscriptionBus;
    use crate::core::ActId;
    use crate::core::ActionId;
    use crate::core::CallMeta;
    use crate::core::Pattern;
    use crate::core::PriorCtxt;
    use crate::core::TxId;

    fn meta(entry: bool) -> CallMeta {
        let prior = if entry { PriorCtxt::entry() } else { PriorCtxt::entry().push(ActionId::new("outer")) };
        CallMeta {
            id: ActId::from("a/t"),
            tx: TxId::new("t"),
            start_ms: 0,
            pattern: "role:x".to_string(),
            action: ActionId::new("act1"),
            entry: prior.entry,
            chain: prior.chain,
            sync: true,
            plugin_name: None,
            plugin_tag: None,
        }
    }

    #[test]
    fn fires_only_on_entry_calls() {
        let bus = SubscriptionBus::new(false);
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        bus.sub(
            Pattern::from_map(&[("role".to_string(), json!("x"))].into_iter().collect()),
            Direction::In,
            Arc::new(move |_, _, _| {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let attrs: serde_json::Map<String, serde_json::Value> = [("role".to_string(), json!("x"))].into_iter().collect();
        bus.notify_in(&meta(true), &attrs);
        bus.notify_in(&meta(false), &attrs);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_propagate() {
        let bus = SubscriptionBus::new(false);
        bus.sub(
            Pattern::from_map(&[("role".to_string(), json!("x"))].into_iter().collect()),
            Direction::In,
            Arc::new(|_, _, _| panic!("boom")),
        );
        let attrs: serde_json::Map<String, serde_json::Value> = [("role".to_string(), json!("x"))].into_iter().collect();
        bus.notify_in(&meta(true), &attrs);
    }
}
