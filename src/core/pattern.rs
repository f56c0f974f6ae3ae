// src/core/pattern.rs
// ============================================================================
// Module: Actiongate Pattern
// Description: Pattern terms, canonicalization, and matching (literal + glob).
// Purpose: Give the pattern index a comparable, hashable pattern representation.
// Dependencies: crate::core::hashing, serde_json
// ============================================================================

//! ## Overview
//! A [`Pattern`] is the set of `(key, literal)` pairs a message must contain
//! to match, per spec §3. Canonical string form is the sorted `k:v,k:v`
//! rendering used for exact-pattern equality (registry overrides,
//! `strict.add`) and for stable map keys in the pattern index.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Map;
use serde_json::Value;

use crate::core::hashing::canonical_json_string;

// ============================================================================
// SECTION: Pattern
// ============================================================================

/// A message template: the `(key, literal)` pairs a message must contain to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Pattern terms, keyed by attribute name, sorted for deterministic iteration.
    terms: BTreeMap<String, String>,
}

impl Pattern {
    /// Builds a pattern from a raw (already-reserved-stripped) attribute map.
    ///
    /// Non-string values are rendered through [`canonical_json_string`] so
    /// that `{"n": 1}` and `{"n": 1.0}` canonicalize identically whenever
    /// `serde_json` itself treats them as the same number.
    #[must_use]
    pub fn from_map(attrs: &Map<String, Value>) -> Self {
        let mut terms = BTreeMap::new();
        for (key, value) in attrs {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => canonical_json_string(other).unwrap_or_else(|_| other.to_string()),
            };
            terms.insert(key.clone(), rendered);
        }
        Self { terms }
    }

    /// Returns the number of terms (the pattern's specificity).
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` for the catch-all (empty) pattern.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the canonical `k:v,k:v` string form, sorted by key.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.terms.iter().map(|(k, v)| format!("{k}:{v}")).collect::<Vec<_>>().join(",")
    }

    /// Returns an iterator over `(key, rendered value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` when every term in `self` is satisfied by `attrs`,
    /// supporting glob wildcards (`*`, `?`) when `glob` is enabled.
    #[must_use]
    pub fn matches(&self, attrs: &Map<String, Value>, glob: bool) -> bool {
        self.terms.iter().all(|(key, pattern_value)| match attrs.get(key) {
            Some(Value::String(actual)) if glob => glob_match(pattern_value, actual),
            Some(actual) => {
                let rendered = match actual {
                    Value::String(s) => s.clone(),
                    other => canonical_json_string(other).unwrap_or_else(|_| other.to_string()),
                };
                &rendered == pattern_value
            }
            None => false,
        })
    }

    /// Returns `true` when `self`'s keys are a superset of `partial`'s keys
    /// and the shared keys' values are equal, used by `list`/`wrap` partial
    /// lookups.
    #[must_use]
    pub fn is_superset_matching(&self, partial: &Pattern) -> bool {
        partial.terms.iter().all(|(key, value)| self.terms.get(key) == Some(value))
    }

    /// Renders this pattern's terms back into an attribute map of string
    /// values, used by `wrap` to re-register over an already-matched pattern.
    #[must_use]
    pub fn to_attrs(&self) -> Map<String, Value> {
        self.terms.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

// ============================================================================
// SECTION: Glob Matching
// ============================================================================

/// Matches `text` against a shell-glob-style `pattern` supporting `*` (any
/// run of characters, including none) and `?` (exactly one character).
#[must_use]
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_inner(&pattern, &text)
}

/// Recursive backtracking glob matcher; patterns here are short (pattern
/// term values), so the naive recursion is not a performance concern.
fn glob_match_inner(pattern: &[char], text: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('*') => glob_match_inner(&pattern[1..], text) || (!text.is_empty() && glob_match_inner(pattern, &text[1..])),
        Some('?') => !text.is_empty() && glob_match_inner(&pattern[1..], &text[1..]),
        Some(ch) => text.first() == Some(ch) && glob_match_inner(&pattern[1..], &text[1..]),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use serde_json::json;

    use super::Pattern;
    use super::glob_match;

    fn map(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn canonical_form_is_sorted_by_key() {
        let pattern = Pattern::from_map(&map(&[("cmd", json!("sum")), ("role", json!("math"))]));
        assert_eq!(pattern.canonical(), "cmd:sum,role:math");
    }

    #[test]
    fn matches_requires_every_term_present_and_equal() {
        let pattern = Pattern::from_map(&map(&[("role", json!("math")), ("cmd", json!("sum"))]));
        let full = map(&[("role", json!("math")), ("cmd", json!("sum")), ("x", json!(1))]);
        let partial = map(&[("role", json!("math"))]);
        assert!(pattern.matches(&full, false));
        assert!(!pattern.matches(&partial, false));
    }

    #[test]
    fn matches_non_string_values_via_canonical_render() {
        let pattern = Pattern::from_map(&map(&[("n", json!(1))]));
        assert!(pattern.matches(&map(&[("n", json!(1))]), false));
        assert!(!pattern.matches(&map(&[("n", json!(2))]), false));
    }

    #[test]
    fn glob_mode_matches_wildcards() {
        let pattern = Pattern::from_map(&map(&[("cmd", json!("su*"))]));
        assert!(pattern.matches(&map(&[("cmd", json!("sum"))]), true));
        assert!(!pattern.matches(&map(&[("cmd", json!("sum"))]), false));
    }

    #[test]
    fn glob_match_handles_question_mark() {
        assert!(glob_match("c?t", "cat"));
        assert!(!glob_match("c?t", "ct"));
        assert!(glob_match("*", ""));
    }

    #[test]
    fn empty_pattern_is_catchall() {
        let pattern = Pattern::from_map(&map(&[]));
        assert!(pattern.is_empty());
        assert!(pattern.matches(&map(&[("anything", json!(true))]), false));
    }
}
