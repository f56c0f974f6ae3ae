// src/runtime/instance.rs
// ============================================================================
// Module: Actiongate Instance (C9)
// Description: The root object: shared state, lifecycle, and public API surface.
// Purpose: Tie together the pattern index, cache, gate, subscribers, and
//          options into the object applications hold and call.
// Dependencies: crate::core, crate::runtime::*, crate::interfaces
// ============================================================================

//! ## Overview
//! [`Instance`] owns the shared [`InstanceInner`] and a root
//! [`Delegate`](crate::runtime::delegate::Delegate). Every public operation
//! (`add`, `act`, `sub`, `ready`, `close`, ...) is a thin forward either to
//! the root delegate or directly to the shared state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;

use serde_json::Map;
use serde_json::Value;

use crate::core::ActError;
use crate::core::ActionId;
use crate::core::IdGenerator;
use crate::core::GlobalStats;
use crate::core::Pattern;
use crate::core::PatternStats;
use crate::interfaces::EventSink;
use crate::interfaces::ErrorHandler;
use crate::interfaces::LifecycleEvent;
use crate::interfaces::TracingEventSink;
use crate::runtime::action_cache::ActionCache;
use crate::runtime::action_registry::ActionRegistry;
use crate::runtime::action_registry::RegisteredAction;
use crate::runtime::action_registry::Validator;
use crate::runtime::delegate::Delegate;
use crate::runtime::dispatcher::ActionHandler;
use crate::runtime::dispatcher::Continuation;
use crate::runtime::gated_executor::Gate;
use crate::runtime::options::Options;
use crate::runtime::options::OptionsPatch;
use crate::runtime::subscription::Direction;
use crate::runtime::subscription::SubscriberFn;
use crate::runtime::subscription::SubscriptionBus;

// ============================================================================
// SECTION: Instance Inner
// ============================================================================

/// Shared state every [`Delegate`] of an instance points to.
pub(crate) struct InstanceInner {
    /// Pattern-matched action store.
    pub(crate) registry: ActionRegistry,
    /// Idempotent outcome cache, keyed by in-flight action id.
    pub(crate) cache: ActionCache,
    /// The root FIFO gate every non-`gate$` call is enqueued on.
    pub(crate) root_gate: Gate,
    /// Registered act-in/act-out observers.
    pub(crate) subs: SubscriptionBus,
    /// Mutable option tree, read at the top of every dispatch.
    pub(crate) options: RwLock<Options>,
    /// Instance-wide call counters.
    pub(crate) global_stats: GlobalStats,
    /// Per-pattern rolling latency/outcome windows.
    pub(crate) pattern_stats: PatternStats,
    /// Generator for in-flight and action identifiers.
    pub(crate) id_gen: IdGenerator,
    /// Registered lifecycle event sinks, `tracing` installed by default.
    pub(crate) sinks: Mutex<Vec<Arc<dyn EventSink>>>,
    /// Optional instance-wide error handler.
    pub(crate) error_handler: Mutex<Option<ErrorHandler>>,
    /// Set once the instance has closed; short-circuits further dispatch.
    pub(crate) closed: AtomicBool,
    /// Set the first time `ready` fires; `set_options` is a no-op afterward.
    pub(crate) options_frozen: AtomicBool,
    /// Instance creation time, the epoch `CallMeta::start_ms` is relative to.
    pub(crate) start: Instant,
}

impl InstanceInner {
    pub(crate) fn idlen(&self) -> usize {
        self.options.read().map(|o| o.idlen).unwrap_or(crate::core::DEFAULT_IDLEN)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_options_frozen(&self) -> bool {
        self.options_frozen.load(Ordering::SeqCst)
    }

    pub(crate) fn freeze_options(&self) {
        self.options_frozen.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// SECTION: Instance
// ============================================================================

/// The root dispatcher object.
#[derive(Clone)]
pub struct Instance {
    root: Delegate,
}

impl Instance {
    /// Creates a new instance with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Creates a new instance seeded with `options`.
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        let inner = Arc::new(InstanceInner {
            registry: ActionRegistry::new(options.glob, options.idlen, options.strict.add, options.internal.catchall),
            cache: ActionCache::new(options.actcache.active, options.actcache.size),
            root_gate: Gate::new(),
            subs: SubscriptionBus::new(options.glob),
            pattern_stats: PatternStats::new(options.stats.size),
            global_stats: GlobalStats::new(),
            id_gen: IdGenerator::new(1),
            sinks: Mutex::new(vec![Arc::new(TracingEventSink) as Arc<dyn EventSink>]),
            error_handler: Mutex::new(None),
            closed: AtomicBool::new(false),
            options_frozen: AtomicBool::new(false),
            start: Instant::now(),
            options: RwLock::new(options),
        });
        Self { root: Delegate::root(inner) }
    }

    /// Registers `handler` under `attrs`.
    ///
    /// # Errors
    ///
    /// Returns [`ActError`] when the cleaned pattern has no matchable keys.
    pub fn add(&self, attrs: &Map<String, Value>, handler: ActionHandler, validate: Option<Validator>, func_name: impl Into<String>) -> Result<ActionId, ActError> {
        let id = self.root.add(attrs, handler, validate, func_name)?;
        self.emit(LifecycleEvent::Add { pattern: Pattern::from_map(attrs).canonical() });
        Ok(id)
    }

    /// Dispatches `attrs` as a message.
    pub fn act(&self, attrs: Map<String, Value>, done: Continuation) {
        self.root.act(attrs, done);
    }

    /// For every action matching `partial`, re-registers `wrapper` in its
    /// place. `wrapper` should call `this.prior(...)` to reach the action
    /// it replaced. Returns the ids of the new registrations.
    ///
    /// # Errors
    ///
    /// Returns [`ActError`] if re-registration fails for any matched pattern.
    pub fn wrap(&self, partial: &Map<String, Value>, wrapper: ActionHandler) -> Result<Vec<ActionId>, ActError> {
        let wrapped = self.root.wrap(partial, wrapper)?;
        let ids = wrapped.iter().map(|(_, id)| id.clone()).collect();
        for (pattern, _) in wrapped {
            self.emit(LifecycleEvent::Add { pattern: pattern.canonical() });
        }
        Ok(ids)
    }

    /// Registers `handler` to observe dispatches matching `attrs`.
    pub fn sub(&self, attrs: &Map<String, Value>, direction: Direction, handler: SubscriberFn) {
        self.root.inner.subs.sub(Pattern::from_map(attrs), direction, handler);
    }

    /// Looks up the action that would handle `attrs`, without dispatching.
    #[must_use]
    pub fn find(&self, attrs: &Map<String, Value>) -> Option<RegisteredAction> {
        self.root.inner.registry.find(attrs)
    }

    /// Enumerates every action whose pattern is a superset of `partial`.
    #[must_use]
    pub fn list(&self, partial: &Map<String, Value>) -> Vec<(Pattern, RegisteredAction)> {
        self.root.inner.registry.list(&Pattern::from_map(partial))
    }

    /// Returns `true` when an exact registration exists for `attrs`.
    #[must_use]
    pub fn has(&self, attrs: &Map<String, Value>) -> bool {
        self.root.inner.registry.has(&Pattern::from_map(attrs))
    }

    /// Runs `hook` once the root gate next becomes idle. The first time
    /// `ready` fires, the option tree is frozen: later `set_options` calls
    /// become no-ops.
    pub fn ready(&self, hook: Box<dyn FnOnce() + Send>) {
        let sinks = Arc::clone(&self.root.inner.sinks);
        let inner = Arc::clone(&self.root.inner);
        self.root.inner.root_gate.ready(Box::new(move || {
            inner.freeze_options();
            if let Ok(sinks) = sinks.lock() {
                for sink in sinks.iter() {
                    sink.on_event(&LifecycleEvent::Ready);
                }
            }
            hook();
        }));
    }

    /// Closes the instance: waits for readiness, marks it closed, dispatches
    /// the close action (`role:seneca,cmd:close`, bypassing the closed-instance
    /// check with `closing$`), then fires `done`.
    pub fn close(&self, done: Box<dyn FnOnce() + Send>) {
        let root = self.root.clone();
        let inner = Arc::clone(&self.root.inner);
        self.ready(Box::new(move || {
            inner.mark_closed();

            let mut message = Map::new();
            message.insert("role".to_string(), Value::String("seneca".to_string()));
            message.insert("cmd".to_string(), Value::String("close".to_string()));
            message.insert("closing$".to_string(), Value::Bool(true));
            message.insert("default$".to_string(), Value::Object(Map::new()));

            let inner_for_close = Arc::clone(&inner);
            root.act(
                message,
                Box::new(move |_result| {
                    if let Ok(sinks) = inner_for_close.sinks.lock() {
                        for sink in sinks.iter() {
                            sink.on_event(&LifecycleEvent::Close);
                        }
                    }
                    done();
                }),
            );
        }));
    }

    /// Returns a clone of the current option tree.
    #[must_use]
    pub fn options(&self) -> Options {
        self.root.inner.options.read().map(|o| o.clone()).unwrap_or_default()
    }

    /// Applies `patch` to the option tree. A no-op once the instance's
    /// first `ready` has fired (spec's frozen-after-init rule): options
    /// read by in-flight calls, and every call dispatched from then on,
    /// must see a stable tree.
    pub fn set_options(&self, patch: OptionsPatch) {
        if self.root.inner.is_options_frozen() {
            return;
        }
        if let Ok(mut options) = self.root.inner.options.write() {
            options.apply(patch);
        }
    }

    /// Returns a delegate scoped with `fixedargs` merged into every outgoing message.
    #[must_use]
    pub fn delegate(&self, fixedargs: Map<String, Value>) -> Delegate {
        let mut delegate = self.root.clone();
        let mut merged = delegate.fixedargs.clone();
        for (key, value) in fixedargs {
            merged.set(key, value);
        }
        delegate.fixedargs = merged;
        delegate
    }

    /// Returns a delegate whose `add`/`act` calls are prefixed with `attrs`.
    #[must_use]
    pub fn fix(&self, attrs: Map<String, Value>) -> Delegate {
        self.root.fix(attrs)
    }

    /// Installs an instance-wide error handler.
    pub fn error(&self, handler: ErrorHandler) {
        if let Ok(mut guard) = self.root.inner.error_handler.lock() {
            *guard = Some(handler);
        }
    }

    /// Registers an additional event sink (alongside the default tracing sink).
    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        if let Ok(mut sinks) = self.root.inner.sinks.lock() {
            sinks.push(sink);
        }
    }

    /// Returns a snapshot of the global call counters.
    #[must_use]
    pub fn stats(&self) -> crate::core::StatsSnapshot {
        self.root.inner.global_stats.snapshot()
    }

    /// Returns the recorded counters and rolling mean latency for the
    /// pattern `attrs` would resolve to, or `None` if it has never been
    /// dispatched.
    #[must_use]
    pub fn pattern_stats(&self, attrs: &Map<String, Value>) -> Option<crate::core::PatternStatsSnapshot> {
        self.root.inner.pattern_stats.summary(&Pattern::from_map(attrs).canonical())
    }

    fn emit(&self, event: LifecycleEvent) {
        if let Ok(sinks) = self.root.inner.sinks.lock() {
            for sink in sinks.iter() {
                sink.on_event(&event);
            }
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}
