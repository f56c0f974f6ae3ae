// src/runtime/action_cache.rs
// ============================================================================
// Module: Actiongate Action Cache (C3)
// Description: Bounded LRU of completed call results, keyed by action-id.
// Purpose: Give retried inbound messages with the same `id$` at-most-once
//          delivery without re-invoking the handler.
// Dependencies: std::collections, std::time, crate::core
// ============================================================================

//! ## Overview
//! `get` replays the full stored `(err, result)` tuple verbatim, so a
//! failure is idempotent exactly like a success. `set` unconditionally
//! stores both outcomes; when the cache is disabled it is a no-op.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use crate::core::ActError;
use crate::core::ActId;
use crate::core::ActionId;

// ============================================================================
// SECTION: Cache Entry
// ============================================================================

/// A completed call's outcome, as replayed verbatim on cache hit.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// `Ok` result or `Err` error, whichever the original call produced.
    pub outcome: Result<serde_json::Value, ActError>,
    /// The action that produced this outcome.
    pub actmeta_id: ActionId,
    /// When the entry was stored.
    pub when: Instant,
}

// ============================================================================
// SECTION: Action Cache
// ============================================================================

/// Bounded LRU of [`CacheEntry`] keyed by in-flight action id.
pub struct ActionCache {
    /// Whether the cache is consulted/populated at all.
    active: bool,
    /// Maximum entries retained before the oldest is evicted.
    capacity: usize,
    /// Cached entries plus their LRU ordering.
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    /// Stored outcomes, keyed by in-flight action id.
    entries: HashMap<ActId, CacheEntry>,
    /// Most-recently-used key at the back; used for bounded eviction.
    order: VecDeque<ActId>,
}

impl ActionCache {
    /// Creates a cache with the given `capacity`. When `active` is `false`,
    /// `get` always misses and `set` is a no-op.
    #[must_use]
    pub fn new(active: bool, capacity: usize) -> Self {
        Self { active, capacity, state: Mutex::new(CacheState::default()) }
    }

    /// Returns the cached outcome for `actid`, if any, touching it as
    /// most-recently-used.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    #[must_use]
    pub fn get(&self, actid: &ActId) -> Option<CacheEntry> {
        if !self.active {
            return None;
        }
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = state.entries.get(actid).cloned()?;
        state.order.retain(|k| k != actid);
        state.order.push_back(actid.clone());
        Some(entry)
    }

    /// Stores `outcome` under `actid`, evicting the least-recently-used
    /// entry if the cache is at capacity. No-op when the cache is disabled.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    pub fn set(&self, actid: ActId, actmeta_id: ActionId, outcome: Result<serde_json::Value, ActError>) {
        if !self.active || self.capacity == 0 {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.order.retain(|k| k != &actid);
        state.order.push_back(actid.clone());
        state.entries.insert(actid, CacheEntry { outcome, actmeta_id, when: Instant::now() });
        while state.entries.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else { break };
            state.entries.remove(&oldest);
        }
    }

    /// Returns the number of entries currently cached.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).entries.len()
    }

    /// Returns `true` when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::ActionCache;
    use crate::core::ActId;
    use crate::core::ActionId;

    #[test]
    fn disabled_cache_never_stores() {
        let cache = ActionCache::new(false, 10);
        cache.set(ActId::from("a/t"), ActionId::new("act1"), Ok(serde_json::json!({"ok": true})));
        assert!(cache.get(&ActId::from("a/t")).is_none());
    }

    #[test]
    fn replays_stored_outcome_verbatim() {
        let cache = ActionCache::new(true, 10);
        let actid = ActId::from("a/t");
        cache.set(actid.clone(), ActionId::new("act1"), Ok(serde_json::json!({"a": 5})));
        let entry = cache.get(&actid).unwrap();
        assert_eq!(entry.outcome.unwrap(), serde_json::json!({"a": 5}));
    }

    #[test]
    fn evicts_least_recently_used_when_over_capacity() {
        let cache = ActionCache::new(true, 1);
        cache.set(ActId::from("a/t"), ActionId::new("act1"), Ok(serde_json::json!(1)));
        cache.set(ActId::from("b/t"), ActionId::new("act1"), Ok(serde_json::json!(2)));
        assert!(cache.get(&ActId::from("a/t")).is_none());
        assert!(cache.get(&ActId::from("b/t")).is_some());
    }
}
