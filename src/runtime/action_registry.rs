// src/runtime/action_registry.rs
// ============================================================================
// Module: Actiongate Action Registry (C2)
// Description: Wraps the pattern index with override policy and metadata.
// Purpose: Turn a raw `add(pattern, action)` call into immutable `ActionMeta`
//          plus an installed handler, honoring `strict.add`/`internal.catchall`.
// Dependencies: crate::core, crate::runtime::pattern_index
// ============================================================================

//! ## Overview
//! [`ActionRegistry::add`] implements spec §4.2 step by step: strip
//! reserved attributes, lift nested-object terms into `rules`,
//! canonicalize, look up any prior registration for the same canonical
//! pattern, apply the override policy, then install.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Map;
use serde_json::Value;

use crate::core::ActError;
use crate::core::ActionId;
use crate::core::ActionMeta;
use crate::core::ErrorKind;
use crate::core::IdGenerator;
use crate::core::Pattern;
use crate::runtime::dispatcher::ActionHandler;
use crate::runtime::dispatcher::Continuation;
use crate::runtime::pattern_index::PatternIndex;

// ============================================================================
// SECTION: Registered Action
// ============================================================================

/// A validator run against a message's matchable attributes before dispatch.
pub type Validator = Arc<dyn Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync>;

/// Everything the dispatcher needs once a pattern has matched: the action's
/// metadata and the handler to invoke.
#[derive(Clone)]
pub struct RegisteredAction {
    /// Immutable registration metadata, including the override chain.
    pub meta: ActionMeta,
    /// The handler to invoke.
    pub handler: ActionHandler,
    /// Optional per-attribute validator.
    pub validate: Option<Validator>,
}

// ============================================================================
// SECTION: Action Registry
// ============================================================================

/// Wraps a [`PatternIndex`] of [`RegisteredAction`]s with the override
/// policy and id assignment described in spec §4.2.
pub struct ActionRegistry {
    /// Pattern-specificity lookup.
    index: PatternIndex<RegisteredAction>,
    /// Id-keyed lookup used by `prior()` to reach an overridden action directly.
    by_id: Mutex<HashMap<ActionId, RegisteredAction>>,
    /// Local action id generator.
    ids: IdGenerator,
    /// Length, in hex characters, of generated action ids.
    idlen: usize,
    /// `strict.add`: overrides require exact canonical-pattern equality.
    strict_add: bool,
    /// `internal.catchall`: whether a true catch-all (empty-pattern) action
    /// may be registered at all, and whether a second registration over it
    /// is treated as an override rather than standing alone.
    catchall_overridable: bool,
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(glob: bool, idlen: usize, strict_add: bool, catchall_overridable: bool) -> Self {
        Self {
            index: PatternIndex::new(glob),
            by_id: Mutex::new(HashMap::new()),
            ids: IdGenerator::new(0),
            idlen,
            strict_add,
            catchall_overridable,
        }
    }

    /// Registers `handler` under `raw_attrs`, after lifting any
    /// object-valued attribute into `rules` and stripping reserved keys.
    ///
    /// # Errors
    ///
    /// Returns [`ActError`] of kind [`ErrorKind::AddEmptyPattern`] when the
    /// cleaned pattern has no matchable keys, unless `internal.catchall` is
    /// on, in which case a genuine catch-all registration is installed.
    pub fn add(
        &self,
        raw_attrs: &Map<String, Value>,
        handler: ActionHandler,
        validate: Option<Validator>,
        func_name: impl Into<String>,
    ) -> Result<ActionId, ActError> {
        let mut terms = Map::new();
        let mut rules = Map::new();
        for (key, value) in raw_attrs {
            if crate::core::is_reserved(key) {
                continue;
            }
            if value.is_object() {
                rules.insert(key.clone(), value.clone());
            } else {
                terms.insert(key.clone(), value.clone());
            }
        }

        let pattern = Pattern::from_map(&terms);
        if pattern.is_empty() && !self.catchall_overridable {
            return Err(ActError::new(ErrorKind::AddEmptyPattern, "add called with no matchable keys"));
        }

        let prior = self.index.find_exact(&pattern.canonical());
        let is_catchall_prior = prior.as_ref().is_some_and(|p| p.meta.pattern.is_empty());
        let accept_prior = match prior {
            Some(_) if is_catchall_prior && !self.catchall_overridable => None,
            Some(ref p) if self.strict_add && p.meta.pattern != pattern.canonical() => None,
            other => other,
        };

        let id = self.ids.next_id(self.idlen);
        let mut meta = ActionMeta::new(id.clone(), &pattern, func_name);
        if !rules.is_empty() {
            meta.rules = Some(Value::Object(rules));
        }
        if let Some(prior) = accept_prior {
            meta = meta.chained_onto(prior.meta.clone());
        }

        let registered = RegisteredAction { meta, handler, validate };
        if let Ok(mut by_id) = self.by_id.lock() {
            by_id.insert(id.clone(), registered.clone());
        }
        self.index.add(pattern, registered);
        Ok(id)
    }

    /// Resolves the most-specific action matching `attrs`.
    #[must_use]
    pub fn find(&self, attrs: &Map<String, Value>) -> Option<RegisteredAction> {
        self.index.find(attrs)
    }

    /// Resolves an action by its registration id, used by `prior()` to
    /// reach the exact overridden action regardless of its current
    /// position in the pattern index.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    #[must_use]
    pub fn find_by_id(&self, id: &ActionId) -> Option<RegisteredAction> {
        self.by_id.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(id).cloned()
    }

    /// Resolves the action registered for the exact canonical pattern, used
    /// to re-enter a `priormeta` directly.
    #[must_use]
    pub fn find_exact(&self, canonical: &str) -> Option<RegisteredAction> {
        self.index.find_exact(canonical)
    }

    /// Enumerates every action whose pattern is a superset of `partial`.
    #[must_use]
    pub fn list(&self, partial: &Pattern) -> Vec<(Pattern, RegisteredAction)> {
        self.index.list(partial)
    }

    /// Returns `true` when an exact canonical match for `pattern` is registered.
    #[must_use]
    pub fn has(&self, pattern: &Pattern) -> bool {
        self.index.has(pattern)
    }
}
