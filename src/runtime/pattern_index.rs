// src/runtime/pattern_index.rs
// ============================================================================
// Module: Actiongate Pattern Index (C1)
// Description: Pattern-to-payload store answering most-specific-match queries.
// Purpose: Give the action registry a reusable "find the best pattern" index.
// Dependencies: std::sync, crate::core::pattern
// ============================================================================

//! ## Overview
//! The index stores `(Pattern, payload)` pairs in registration order.
//! [`PatternIndex::find`] returns the payload of the most-specific pattern
//! matching a message; ties are broken by registration order (later wins),
//! per spec §4.1.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use serde_json::Map;
use serde_json::Value;

use crate::core::Pattern;

// ============================================================================
// SECTION: Pattern Index
// ============================================================================

/// One registered `(pattern, payload)` pair plus its insertion order.
struct Entry<T> {
    /// The registered pattern.
    pattern: Pattern,
    /// The stored value.
    payload: T,
    /// Insertion order, used to break specificity ties.
    order: usize,
}

/// A pattern-keyed store of arbitrary payloads, supporting the `add`/`find`/`list`
/// operations of spec §4.1.
pub struct PatternIndex<T> {
    /// Whether string pattern values support `*`/`?` wildcards.
    glob: bool,
    /// Next insertion-order counter to assign.
    next_order: Mutex<usize>,
    /// Registered `(pattern, payload)` pairs.
    entries: Mutex<Vec<Entry<T>>>,
}

impl<T: Clone> PatternIndex<T> {
    /// Creates an empty index. `glob` enables `*`/`?` wildcard matching on
    /// string pattern values.
    #[must_use]
    pub fn new(glob: bool) -> Self {
        Self { glob, next_order: Mutex::new(0), entries: Mutex::new(Vec::new()) }
    }

    /// Installs `payload` under `pattern`. If an identical canonical pattern
    /// already exists, it is overwritten and its previous payload returned
    /// so callers can chain overrides.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    pub fn add(&self, pattern: Pattern, payload: T) -> Option<T> {
        let canonical = pattern.canonical();
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(existing) = entries.iter_mut().find(|e| e.pattern.canonical() == canonical) {
            return Some(std::mem::replace(&mut existing.payload, payload));
        }
        let mut next_order = self.next_order.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let order = *next_order;
        *next_order += 1;
        entries.push(Entry { pattern, payload, order });
        None
    }

    /// Returns the payload registered for `canonical`'s exact pattern string, if any.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    #[must_use]
    pub fn find_exact(&self, canonical: &str) -> Option<T> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.iter().find(|e| e.pattern.canonical() == canonical).map(|e| e.payload.clone())
    }

    /// Returns the payload of the most-specific pattern whose every term
    /// matches `attrs`. Specificity is the matched pattern's key count; on
    /// a tie, the most recently added wins.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    #[must_use]
    pub fn find(&self, attrs: &Map<String, Value>) -> Option<T> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries
            .iter()
            .filter(|e| e.pattern.matches(attrs, self.glob))
            .max_by_key(|e| (e.pattern.len(), e.order))
            .map(|e| e.payload.clone())
    }

    /// Enumerates every `(pattern, payload)` whose keys are a superset of
    /// `partial`'s keys and whose shared values match `partial`.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    #[must_use]
    pub fn list(&self, partial: &Pattern) -> Vec<(Pattern, T)> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries
            .iter()
            .filter(|e| e.pattern.is_superset_matching(partial))
            .map(|e| (e.pattern.clone(), e.payload.clone()))
            .collect()
    }

    /// Returns `true` when an exact canonical match for `pattern` is registered.
    #[must_use]
    pub fn has(&self, pattern: &Pattern) -> bool {
        self.find_exact(&pattern.canonical()).is_some()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use serde_json::json;

    use super::PatternIndex;
    use crate::core::Pattern;

    fn map(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn find_prefers_more_specific_pattern() {
        let index = PatternIndex::new(false);
        let broad = Pattern::from_map(&map(&[("role", json!("math"))]));
        let narrow = Pattern::from_map(&map(&[("role", json!("math")), ("cmd", json!("sum"))]));
        index.add(broad, "A");
        index.add(narrow, "B");

        let found = index.find(&map(&[("role", json!("math")), ("cmd", json!("sum"))]));
        assert_eq!(found, Some("B"));
    }

    #[test]
    fn find_breaks_ties_by_registration_order() {
        let index = PatternIndex::new(false);
        let pattern = Pattern::from_map(&map(&[("role", json!("math"))]));
        index.add(pattern.clone(), "A");
        index.add(pattern, "B");

        assert_eq!(index.find(&map(&[("role", json!("math"))])), Some("B"));
    }

    #[test]
    fn add_overwrites_exact_pattern_and_returns_previous() {
        let index = PatternIndex::new(false);
        let pattern = Pattern::from_map(&map(&[("role", json!("math"))]));
        assert_eq!(index.add(pattern.clone(), "A"), None);
        assert_eq!(index.add(pattern, "B"), Some("A"));
    }

    #[test]
    fn list_returns_superset_matches() {
        let index = PatternIndex::new(false);
        index.add(Pattern::from_map(&map(&[("role", json!("math")), ("cmd", json!("sum"))])), "A");
        index.add(Pattern::from_map(&map(&[("role", json!("other"))])), "B");

        let partial = Pattern::from_map(&map(&[("role", json!("math"))]));
        let results = index.list(&partial);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1, "A");
    }
}
