// src/runtime/dispatcher.rs
// ============================================================================
// Module: Actiongate Dispatcher (C5)
// Description: The `act` pipeline: resolve, gate, invoke, and continue.
// Purpose: Turn an inbound message into exactly one delivered (err, result).
// Dependencies: crate::core, crate::runtime::{action_registry, action_cache,
//               gated_executor, subscription, instance, delegate}
// ============================================================================

//! ## Overview
//! [`dispatch`] implements spec §4.5 end to end: normalize the message,
//! replay from cache if possible, pick a gate, resolve the action, run the
//! loop/validator checks, build `meta$`, invoke the handler, then run the
//! continuation that validates the result, caches it, and delivers it
//! exactly once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;

use crate::core::ActError;
use crate::core::ActId;
use crate::core::ActionId;
use crate::core::CallMeta;
use crate::core::ErrorKind;
use crate::core::Message;
use crate::core::Pattern;
use crate::core::PriorCtxt;
use crate::core::TxId;
use crate::interfaces::LifecycleEvent;
use crate::runtime::action_registry::RegisteredAction;
use crate::runtime::delegate::Delegate;
use crate::runtime::gated_executor::GateTask;
use crate::runtime::instance::InstanceInner;

// ============================================================================
// SECTION: Handler and Continuation Types
// ============================================================================

/// Delivers a call's final outcome. Called exactly once.
pub type Continuation = Box<dyn FnOnce(Result<Value, ActError>) + Send>;

/// An action's handler body. Receives the per-call delegate, the cleaned
/// call message, and the continuation to resolve with.
pub type ActionHandler = Arc<dyn Fn(Delegate, Message, Continuation) + Send + Sync>;

// ============================================================================
// SECTION: Dispatch Entry Point
// ============================================================================

/// Dispatches `message` through `delegate`'s instance, delivering the
/// outcome to `done` (a no-op sink if the caller does not care).
pub fn dispatch(delegate: &Delegate, mut message: Message, done: Continuation) {
    let inner = Arc::clone(&delegate.inner);

    // --- Step 1: normalize -------------------------------------------------
    let fixedargs_win = inner.options.read().map(|o| o.strict.fixedargs).unwrap_or(false);
    message.merge(&delegate.fixedargs, fixedargs_win);

    let reserved = message.reserved();
    let split = reserved.actid.as_ref().and_then(ActId::split);
    let tx = reserved
        .tx
        .clone()
        .or_else(|| split.as_ref().map(|(_, tx)| tx.clone()))
        .or_else(|| delegate.tx.clone())
        .unwrap_or_else(|| TxId::new(inner.id_gen.next_id(8).as_str()));
    let actid = reserved.actid.clone().unwrap_or_else(|| {
        let local = inner.id_gen.next_id(inner.idlen());
        ActId::from_parts(&local, &tx)
    });

    // --- Step 2: cache replay ------------------------------------------------
    let cache_active = inner.options.read().map(|o| o.actcache.active).unwrap_or(true);
    if cache_active {
        if let Some(entry) = inner.cache.get(&actid) {
            inner.global_stats.record_cache_hit();
            thread::spawn(move || done(entry.outcome));
            return;
        }
    }

    // --- Step 3: gate selection ---------------------------------------------
    let gate = if reserved.gate { delegate.gate.sub_gate() } else { delegate.gate.clone() };

    // --- Step 4: enqueue -----------------------------------------------------
    let timeout = reserved
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| inner.options.read().map(|o| o.timeout).unwrap_or(Duration::from_millis(22_222)));

    let fatal = reserved.fatal;
    let history = reserved.history.clone();
    let prior_ctxt = delegate.prior_ctxt.clone();
    let delegate_for_task = delegate.clone();
    let actid_for_task = actid.clone();
    let tx_for_task = tx.clone();

    let description = format!("act:{actid}");
    let done = Arc::new(std::sync::Mutex::new(Some(done)));
    let done_for_run = Arc::clone(&done);
    let done_for_timeout = Arc::clone(&done);
    let actid_for_timeout = actid.clone();
    let inner_for_timeout = Arc::clone(&inner);

    gate.submit(GateTask {
        description,
        timeout,
        run: Box::new(move |gate_done| {
            run_call(
                &delegate_for_task,
                message,
                actid_for_task,
                tx_for_task,
                history,
                fatal,
                &prior_ctxt,
                gate_done,
                done_for_run,
            );
        }),
        on_timeout: Box::new(move || {
            if let Ok(mut slot) = done_for_timeout.lock() {
                if let Some(done) = slot.take() {
                    let err = ActError::new(ErrorKind::Timeout, "gate task timed out").with_actid(actid_for_timeout);
                    inner_for_timeout.global_stats.record_done(true);
                    done(Err(err));
                }
            }
        }),
    });
}

// ============================================================================
// SECTION: Call Execution
// ============================================================================

#[allow(clippy::too_many_arguments, reason = "Each argument is a distinct piece of spec-mandated call state; bundling would only obscure it.")]
fn run_call(
    delegate: &Delegate,
    message: Message,
    actid: ActId,
    tx: TxId,
    history: Vec<String>,
    fatal: bool,
    prior_ctxt: &PriorCtxt,
    gate_done: crate::runtime::gated_executor::Done,
    done: Arc<std::sync::Mutex<Option<Continuation>>>,
) {
    let inner = Arc::clone(&delegate.inner);
    inner.global_stats.record_call();

    let call_started = Instant::now();
    let attrs = message.matchable();
    let canonical_pattern = Pattern::from_map(&attrs).canonical();

    let resolved = if let Some(forced) = &delegate.forced_action {
        Some(forced.clone())
    } else {
        inner.registry.find(&attrs)
    };

    let Some(action) = resolved else {
        let strict_find = inner.options.read().map(|o| o.strict.find).unwrap_or(true);
        let outcome = match reserved_default(&message) {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(err),
            None if strict_find => Err(ActError::new(ErrorKind::ActNotFound, "no action matched and no default$ was given")),
            None => Ok(Value::Object(serde_json::Map::new())),
        };
        finish(delegate, actid, tx, None, outcome, fatal, &canonical_pattern, call_started, gate_done, done);
        return;
    };

    let maxloop = inner.options.read().map(|o| o.strict.maxloop).unwrap_or(11);
    let occurrences = history.iter().filter(|id| *id == action.meta.id.as_str()).count();
    if u32::try_from(occurrences).unwrap_or(u32::MAX) > maxloop {
        let err = ActError::new(ErrorKind::ActLoop, "history$ depth exceeded strict.maxloop")
            .with_pattern(Pattern::from_map(&attrs));
        finish(delegate, actid, tx, Some(action.meta.id.clone()), Err(err), fatal, &canonical_pattern, call_started, gate_done, done);
        return;
    }

    if let Some(validate) = &action.validate {
        if let Err(reason) = validate(&attrs) {
            let err = ActError::new(ErrorKind::ActInvalidMsg, reason).with_pattern(Pattern::from_map(&attrs));
            finish(delegate, actid, tx, Some(action.meta.id.clone()), Err(err), fatal, &canonical_pattern, call_started, gate_done, done);
            return;
        }
    }

    let meta = CallMeta::new(actid.clone(), tx.clone(), elapsed_ms(&inner.start), &Pattern::from_map(&attrs), action.meta.clone(), prior_ctxt, true);

    let call_delegate = delegate.for_call(&action, prior_ctxt, tx.clone());

    emit(&inner, LifecycleEvent::ActIn { meta: meta.clone() });
    inner.subs.notify_in(&meta, &attrs);

    if inner.is_closed() && message.get("closing$").and_then(Value::as_bool) != Some(true) {
        let err = ActError::new(ErrorKind::InstanceClosed, "dispatch attempted after instance close");
        finish(delegate, actid, tx, Some(action.meta.id.clone()), Err(err), fatal, &canonical_pattern, call_started, gate_done, done);
        return;
    }

    let action_id_for_result = action.meta.id.clone();
    let meta_for_result = meta.clone();
    let delegate_for_result = delegate.clone();
    let attrs_for_result = attrs.clone();
    let inner_for_result = Arc::clone(&inner);

    // `gate_done` must fire at most once, but both the continuation (the
    // common path) and the panic fallback below may race to finish the
    // task, so it lives behind a one-shot slot like `done` already does.
    let gate_done_slot = Arc::new(std::sync::Mutex::new(Some(gate_done)));
    let gate_done_for_cont = Arc::clone(&gate_done_slot);
    let gate_done_for_panic = Arc::clone(&gate_done_slot);

    let actid_for_panic = actid.clone();
    let tx_for_panic = tx.clone();
    let action_id_for_panic = action_id_for_result.clone();
    let delegate_for_panic = delegate.clone();
    let done_for_panic = Arc::clone(&done);
    let pattern_for_cont = canonical_pattern.clone();
    let pattern_for_panic = canonical_pattern.clone();

    let handler = Arc::clone(&action.handler);

    // This closure is the call's single continuation: it must not block the
    // gate's worker thread (which may be invoking `handler` synchronously
    // right now), so every step from here on runs whenever `done` is
    // eventually called, on whatever thread calls it.
    let continuation: Continuation = Box::new(move |result| {
        let outcome = result.map_err(|err| err.wrap_execute("action handler returned an error"));

        let strict_result = inner_for_result.options.read().map(|o| o.strict.result).unwrap_or(true);
        let outcome = outcome.and_then(|value| {
            if strict_result && !(value.is_object() || value.is_array() || value.is_null()) {
                Err(ActError::new(ErrorKind::ResultNotObjArr, "success result is not an object or array"))
            } else {
                Ok(value)
            }
        });

        match &outcome {
            Ok(result) => {
                emit(&inner_for_result, LifecycleEvent::ActOut { meta: meta_for_result.clone(), result: result.clone() });
                inner_for_result.subs.notify_out(&meta_for_result, &attrs_for_result, result);
            }
            Err(err) => {
                emit(&inner_for_result, LifecycleEvent::ActErr { meta: meta_for_result.clone(), error: Arc::new(err.clone()) });
                inner_for_result.subs.notify_out(&meta_for_result, &attrs_for_result, &Value::Null);
            }
        }

        if let Some(gate_done) = take_gate_done(&gate_done_for_cont) {
            finish(&delegate_for_result, actid, tx, Some(action_id_for_result), outcome, fatal, &pattern_for_cont, call_started, gate_done, done);
        }
    });

    // Only the synchronous call to `handler` is wrapped: a handler that
    // hands `done` to another thread (or never calls it) returns here
    // immediately, letting the gate's own per-task timeout take over.
    let invoked = catch_unwind(AssertUnwindSafe(|| {
        handler(call_delegate, message, continuation);
    }));

    if invoked.is_err() {
        if let Some(gate_done) = take_gate_done(&gate_done_for_panic) {
            let err = ActError::new(ErrorKind::ActExecute, "action handler panicked");
            finish(&delegate_for_panic, actid_for_panic, tx_for_panic, Some(action_id_for_panic), Err(err), fatal, &pattern_for_panic, call_started, gate_done, done_for_panic);
        }
    }
}

/// Takes the gate-completion callback out of its one-shot slot. Returns
/// `None` if another path (a panic, a prior completion) already took it.
fn take_gate_done(slot: &Arc<std::sync::Mutex<Option<crate::runtime::gated_executor::Done>>>) -> Option<crate::runtime::gated_executor::Done> {
    slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take()
}

fn elapsed_ms(start: &Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn reserved_default(message: &Message) -> Option<Result<Value, ActError>> {
    let default = message.get("default$")?;
    if default.is_object() || default.is_array() {
        Some(Ok(default.clone()))
    } else {
        Some(Err(ActError::new(ErrorKind::ActDefaultBad, "default$ was present but not an object or array")))
    }
}

#[allow(clippy::too_many_arguments, reason = "Each argument is a distinct piece of spec-mandated call state; bundling would only obscure it.")]
fn finish(
    delegate: &Delegate,
    actid: ActId,
    _tx: TxId,
    action_id: Option<ActionId>,
    outcome: Result<Value, ActError>,
    fatal: bool,
    pattern: &str,
    started: Instant,
    gate_done: crate::runtime::gated_executor::Done,
    done: Arc<std::sync::Mutex<Option<Continuation>>>,
) {
    let inner = Arc::clone(&delegate.inner);
    let failed = outcome.is_err();
    inner.global_stats.record_done(failed);
    inner.pattern_stats.record(pattern, elapsed_ms(&started), failed);

    inner.cache.set(actid, action_id.clone().unwrap_or_else(|| ActionId::new("unknown")), outcome.clone());

    let mut suppress = false;
    if let Err(err) = &outcome {
        emit(&inner, LifecycleEvent::Error(Arc::new(err.clone())));
        if let Ok(guard) = inner.error_handler.lock() {
            if let Some(handler) = guard.as_ref() {
                suppress = handler(err);
            }
        }
        if fatal {
            inner.mark_closed();
            emit(&inner, LifecycleEvent::Error(Arc::new(err.clone())));
        }
    }

    gate_done();

    if suppress && !fatal {
        return;
    }

    if let Ok(mut slot) = done.lock() {
        if let Some(continuation) = slot.take() {
            continuation(outcome);
        }
    }
}

fn emit(inner: &Arc<InstanceInner>, event: LifecycleEvent) {
    if let Ok(sinks) = inner.sinks.lock() {
        for sink in sinks.iter() {
            sink.on_event(&event);
        }
    }
}
