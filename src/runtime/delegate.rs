// src/runtime/delegate.rs
// ============================================================================
// Module: Actiongate Delegate Factory (C6)
// Description: Per-call/per-scope view of the instance, cheap to clone.
// Purpose: Give handlers `this.prior(...)`, `this.fix(...)`, `this.gate()`
//          without copying the instance's shared state.
// Dependencies: crate::core, crate::runtime::{instance, action_registry, gated_executor}
// ============================================================================

//! ## Overview
//! A [`Delegate`] is an `Arc`-backed view: the pattern index, cache,
//! subscriber bus, and stats all live on the shared [`InstanceInner`] a
//! delegate points to. Delegation only ever adds scoping state
//! (`fixedargs`, `fix_attrs`, a gate, a prior pointer) — never a deep copy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::core::ActionId;
use crate::core::Message;
use crate::core::Pattern;
use crate::core::PriorCtxt;
use crate::core::TxId;
use crate::runtime::action_registry::RegisteredAction;
use crate::runtime::action_registry::Validator;
use crate::runtime::dispatcher;
use crate::runtime::dispatcher::ActionHandler;
use crate::runtime::dispatcher::Continuation;
use crate::runtime::gated_executor::Gate;
use crate::runtime::instance::InstanceInner;

/// Reserved attributes stripped from a message before a `prior()` re-entry,
/// per spec §4.5: each prior hop is a fresh call, not a replay of the one
/// it supersedes.
const PRIOR_STRIPPED_KEYS: [&str; 5] = ["id$", "gate$", "actid$", "meta$", "transport$"];

// ============================================================================
// SECTION: Delegate
// ============================================================================

/// A scoped, `Arc`-backed view of an instance.
#[derive(Clone)]
pub struct Delegate {
    /// Shared instance state.
    pub(crate) inner: Arc<InstanceInner>,
    /// Attributes merged into outgoing messages, caller-wins unless `strict.fixedargs`.
    pub(crate) fixedargs: Message,
    /// Attributes prefixed onto `add`/`act` calls made through this delegate (`fix()`).
    pub(crate) fix_attrs: Message,
    /// Transaction id inherited from the call this delegate was handed to, if any.
    pub(crate) tx: Option<TxId>,
    /// Gate this delegate's `act` calls are enqueued on.
    pub(crate) gate: Gate,
    /// `true` once `gate()` was called; the next `act` implicitly sets `gate$`.
    pub(crate) implicit_gate: bool,
    /// Set by `prior()` to bypass pattern resolution and re-enter a specific action.
    pub(crate) forced_action: Option<RegisteredAction>,
    /// Id of the action this delegate's current call overrode, if any.
    pub(crate) prior_action_id: Option<ActionId>,
    /// Id of the action this delegate's current call resolved to.
    pub(crate) current_action_id: Option<ActionId>,
    /// Super-call chain context for loop detection and `meta$.entry`.
    pub(crate) prior_ctxt: PriorCtxt,
}

impl Delegate {
    /// Builds the root delegate for a freshly created instance.
    pub(crate) fn root(inner: Arc<InstanceInner>) -> Self {
        let gate = inner.root_gate.clone();
        Self {
            inner,
            fixedargs: Message::new(),
            fix_attrs: Message::new(),
            tx: None,
            gate,
            implicit_gate: false,
            forced_action: None,
            prior_action_id: None,
            current_action_id: None,
            prior_ctxt: PriorCtxt::entry(),
        }
    }

    /// Builds the per-call delegate a handler body runs as `this`.
    pub(crate) fn for_call(&self, action: &RegisteredAction, prior_ctxt: &PriorCtxt, tx: TxId) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            fixedargs: self.fixedargs.clone(),
            fix_attrs: self.fix_attrs.clone(),
            tx: Some(tx),
            gate: self.gate.clone(),
            implicit_gate: false,
            forced_action: None,
            prior_action_id: action.meta.priormeta.as_ref().map(|prior| prior.id.clone()),
            current_action_id: Some(action.meta.id.clone()),
            prior_ctxt: prior_ctxt.clone(),
        }
    }

    /// Registers `handler` under `attrs`, merged with this delegate's fixed
    /// pattern prefix (see [`Delegate::fix`]).
    ///
    /// # Errors
    ///
    /// See [`crate::runtime::action_registry::ActionRegistry::add`].
    pub fn add(&self, attrs: &Map<String, Value>, handler: ActionHandler, validate: Option<Validator>, func_name: impl Into<String>) -> Result<ActionId, crate::core::ActError> {
        let mut merged = attrs.clone();
        for (key, value) in self.fix_attrs.iter() {
            merged.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self.inner.registry.add(&merged, handler, validate, func_name)
    }

    /// Dispatches `attrs` as a message, merging in this delegate's fixed
    /// attributes and (if this delegate came from [`Delegate::gate`]) an
    /// implicit `gate$`.
    pub fn act(&self, mut attrs: Map<String, Value>, done: Continuation) {
        for (key, value) in self.fix_attrs.iter() {
            attrs.entry(key.clone()).or_insert_with(|| value.clone());
        }
        if self.implicit_gate {
            attrs.insert("gate$".to_string(), Value::Bool(true));
        }
        dispatcher::dispatch(self, Message::from_map(attrs), done);
    }

    /// Re-enters the dispatcher bound directly to the action this call's
    /// action overrode, bypassing pattern resolution. Extends the prior
    /// chain by the calling action's id.
    pub fn prior(&self, mut attrs: Map<String, Value>, done: Continuation) {
        for key in PRIOR_STRIPPED_KEYS {
            attrs.remove(key);
        }

        let Some(prior_id) = &self.prior_action_id else {
            let default = attrs.remove("default$").unwrap_or(Value::Null);
            done(Ok(default));
            return;
        };
        let Some(action) = self.inner.registry.find_by_id(prior_id) else {
            done(Ok(Value::Null));
            return;
        };

        let mut forced = self.clone();
        let chained_id = self.current_action_id.clone().unwrap_or_else(|| ActionId::new("-"));
        forced.prior_ctxt = self.prior_ctxt.push(chained_id);
        forced.forced_action = Some(action);

        dispatcher::dispatch(&forced, Message::from_map(attrs), done);
    }

    /// For every action whose pattern is a superset of `partial` (merged
    /// with this delegate's fixed prefix), re-registers `wrapper` at that
    /// exact pattern. `wrapper` runs as the new handler for the pattern and
    /// is expected to call `this.prior(...)` to reach the action it
    /// replaced. Returns the matched pattern and the new registration id
    /// for each wrapped action.
    ///
    /// # Errors
    ///
    /// See [`crate::runtime::action_registry::ActionRegistry::add`].
    pub fn wrap(&self, partial: &Map<String, Value>, wrapper: ActionHandler) -> Result<Vec<(Pattern, ActionId)>, crate::core::ActError> {
        let mut merged = partial.clone();
        for (key, value) in self.fix_attrs.iter() {
            merged.entry(key.clone()).or_insert_with(|| value.clone());
        }
        let selector = Pattern::from_map(&merged);
        let matches = self.inner.registry.list(&selector);

        let mut wrapped = Vec::with_capacity(matches.len());
        for (matched_pattern, _original) in matches {
            let attrs = matched_pattern.to_attrs();
            let id = self.inner.registry.add(&attrs, Arc::clone(&wrapper), None, "wrap")?;
            wrapped.push((matched_pattern, id));
        }
        Ok(wrapped)
    }

    /// Returns a delegate whose `add` prefixes every registration with
    /// `attrs` and whose `act` merges `attrs` into outgoing messages.
    #[must_use]
    pub fn fix(&self, attrs: Map<String, Value>) -> Self {
        let mut fix_attrs = self.fix_attrs.clone();
        for (key, value) in attrs {
            fix_attrs.set(key, value);
        }
        let mut next = self.clone();
        next.fix_attrs = fix_attrs;
        next
    }

    /// Returns a delegate whose subsequent `act` calls implicitly set `gate$`.
    #[must_use]
    pub fn gate(&self) -> Self {
        let mut next = self.clone();
        next.implicit_gate = true;
        next
    }
}
