// src/core/meta.rs
// ============================================================================
// Module: Actiongate Call Metadata
// Description: Action registration metadata, prior-chain context, and the
//              per-call `meta$` structure attached to every dispatch.
// Purpose: Carry everything downstream code needs to know about a call's
//          origin and history without re-deriving it from the message.
// Dependencies: crate::core::identifiers, crate::core::pattern
// ============================================================================

//! ## Overview
//! [`ActionMeta`] is immutable once an action is registered. [`PriorCtxt`]
//! tracks the super-call chain a handler is entered with. [`CallMeta`] is
//! the Rust realization of the wire `meta$` object attached to every
//! dispatched message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::ActId;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::TxId;
use crate::core::pattern::Pattern;

// ============================================================================
// SECTION: Action Metadata
// ============================================================================

/// Metadata attached to a registered action, set once at `add` time.
#[derive(Debug, Clone)]
pub struct ActionMeta {
    /// Local action id, assigned at registration.
    pub id: ActionId,
    /// Canonical pattern string this action was registered under.
    pub pattern: String,
    /// Human-readable function name, for logs and introspection.
    pub func_name: String,
    /// Validation/normalization rules attached via `add(pattern, { rules })`.
    pub rules: Option<serde_json::Value>,
    /// Owning plugin name, if registered through a plugin.
    pub plugin_name: Option<String>,
    /// Plugin tag (disambiguates multiple instances of the same plugin).
    pub plugin_tag: Option<String>,
    /// `name$tag` fully qualified plugin identifier.
    pub plugin_fullname: Option<String>,
    /// Source location hint captured at registration time, for diagnostics.
    pub callpoint: Option<String>,
    /// Metadata of the action this one overrides, if any.
    pub priormeta: Option<Box<ActionMeta>>,
    /// Semicolon-joined `id;id;id` chain of overridden ancestor ids, if any.
    pub priorpath: Option<String>,
    /// Deprecation notice to log on each call, if set.
    pub deprecate: Option<String>,
    /// `true` when this action exists purely to wrap/override a prior one.
    pub sub: bool,
}

impl ActionMeta {
    /// Creates metadata for a freshly registered action with no prior chain.
    #[must_use]
    pub fn new(id: ActionId, pattern: &Pattern, func_name: impl Into<String>) -> Self {
        Self {
            id,
            pattern: pattern.canonical(),
            func_name: func_name.into(),
            rules: None,
            plugin_name: None,
            plugin_tag: None,
            plugin_fullname: None,
            callpoint: None,
            priormeta: None,
            priorpath: None,
            deprecate: None,
            sub: false,
        }
    }

    /// Returns a new metadata record chained onto `prior`, as happens when
    /// `add` is called again for an already-registered pattern. `priorpath`
    /// accumulates into a semicolon-joined `id;id;id` chain of every
    /// overridden ancestor, outermost-override-first.
    #[must_use]
    pub fn chained_onto(mut self, prior: ActionMeta) -> Self {
        self.priorpath = Some(match &prior.priorpath {
            Some(rest) => format!("{};{rest}", prior.id),
            None => prior.id.to_string(),
        });
        self.priormeta = Some(Box::new(prior));
        self
    }
}

// ============================================================================
// SECTION: Prior Chain Context
// ============================================================================

/// Tracks the super-call chain a handler executes within.
#[derive(Debug, Clone, Default)]
pub struct PriorCtxt {
    /// Action ids visited, outermost first.
    pub chain: Vec<ActionId>,
    /// `true` for the outermost call in the chain (not reached via `prior()`).
    pub entry: bool,
    /// Nesting depth, equal to `chain.len()`.
    pub depth: u32,
}

impl PriorCtxt {
    /// Returns the entry context for a brand-new dispatch.
    #[must_use]
    pub fn entry() -> Self {
        Self { chain: Vec::new(), entry: true, depth: 0 }
    }

    /// Returns a new context extended with `id`, for a `prior()` re-entry.
    #[must_use]
    pub fn push(&self, id: ActionId) -> Self {
        let mut chain = self.chain.clone();
        chain.push(id);
        Self { depth: u32::try_from(chain.len()).unwrap_or(u32::MAX), chain, entry: false }
    }

    /// Returns `true` when `id` already appears in the chain (a loop).
    #[must_use]
    pub fn contains(&self, id: &ActionId) -> bool {
        self.chain.contains(id)
    }
}

// ============================================================================
// SECTION: Call Metadata (wire `meta$`)
// ============================================================================

/// The Rust realization of the `meta$` object attached to every dispatched
/// message: the call's identity, origin, and prior-chain context.
#[derive(Debug, Clone)]
pub struct CallMeta {
    /// In-flight action id (`local/tx`) for this call.
    pub id: ActId,
    /// Transaction correlation id.
    pub tx: TxId,
    /// Monotonic start time, in milliseconds since the instance's epoch.
    pub start_ms: u64,
    /// Canonical pattern string the call matched.
    pub pattern: String,
    /// Registered action id that will handle (or handled) the call.
    pub action: ActionId,
    /// `true` when this call is the outermost entry point (mirrors `PriorCtxt::entry`).
    pub entry: bool,
    /// Ordered ids of every action visited so far, for loop detection.
    pub chain: Vec<ActionId>,
    /// `true` when the call was dispatched synchronously (no gate involved).
    pub sync: bool,
    /// Owning plugin name of the resolved action, if any.
    pub plugin_name: Option<String>,
    /// Plugin tag of the resolved action, if any.
    pub plugin_tag: Option<String>,
}

impl CallMeta {
    /// Builds call metadata for a freshly dispatched message.
    #[must_use]
    pub fn new(id: ActId, tx: TxId, start_ms: u64, pattern: &Pattern, action: ActionMeta, prior: &PriorCtxt, sync: bool) -> Self {
        Self {
            id,
            tx,
            start_ms,
            pattern: pattern.canonical(),
            action: action.id.clone(),
            entry: prior.entry,
            chain: prior.chain.clone(),
            sync,
            plugin_name: action.plugin_name.clone(),
            plugin_tag: action.plugin_tag.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ActId;
    use super::ActionId;
    use super::PriorCtxt;
    use super::TxId;

    #[test]
    fn prior_ctxt_entry_has_zero_depth() {
        let ctxt = PriorCtxt::entry();
        assert!(ctxt.entry);
        assert_eq!(ctxt.depth, 0);
    }

    #[test]
    fn prior_ctxt_push_tracks_chain_and_detects_membership() {
        let root = PriorCtxt::entry();
        let id = ActionId::new("a1");
        let next = root.push(id.clone());
        assert!(!next.entry);
        assert_eq!(next.depth, 1);
        assert!(next.contains(&id));
        assert!(!next.contains(&ActionId::new("a2")));
    }

    #[test]
    fn actid_roundtrips_through_parts() {
        let local = ActionId::new("abc123");
        let tx = TxId::new("txn1");
        let actid = ActId::from_parts(&local, &tx);
        assert_eq!(actid.split(), Some((local, tx)));
    }
}
