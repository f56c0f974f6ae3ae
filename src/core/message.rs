// src/core/message.rs
// ============================================================================
// Module: Actiongate Message
// Description: Unordered key/value message envelope with reserved control attributes.
// Purpose: Separate pattern-matchable data from `$`-suffixed control metadata.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Message`] wraps a JSON object. Keys ending in `$` are control
//! metadata (see [`ReservedAttrs`]) and never participate in pattern
//! matching; [`Message::matchable`] strips them before the pattern index
//! sees the message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::ActId;
use crate::core::identifiers::TxId;

// ============================================================================
// SECTION: Message
// ============================================================================

/// An unordered mapping from attribute name to value.
///
/// Insertion order is preserved by the underlying `serde_json::Map` (via the
/// `preserve_order` feature) purely for readable `Debug` output; matching
/// and canonicalization are always order-independent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Backing attribute map, including any `$`-suffixed control keys.
    attrs: Map<String, Value>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing JSON object as a message.
    #[must_use]
    pub fn from_map(attrs: Map<String, Value>) -> Self {
        Self { attrs }
    }

    /// Sets an attribute, returning the previous value if any.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attrs.insert(key.into(), value.into())
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Removes and returns the value for `key`, if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attrs.remove(key)
    }

    /// Returns `true` when the message has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Returns an iterator over all `(key, value)` pairs, including reserved ones.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attrs.iter()
    }

    /// Merges `other` into `self`. Keys present in both keep `self`'s value
    /// unless `other_wins` is set, matching the `strict.fixedargs` switch
    /// described in the dispatcher's normalization step.
    pub fn merge(&mut self, other: &Message, other_wins: bool) {
        for (key, value) in &other.attrs {
            if other_wins || !self.attrs.contains_key(key) {
                self.attrs.insert(key.clone(), value.clone());
            }
        }
    }

    /// Returns a copy of this message with all reserved (`$`-suffixed)
    /// attributes removed, suitable for pattern matching.
    #[must_use]
    pub fn matchable(&self) -> Map<String, Value> {
        self.attrs.iter().filter(|(key, _)| !is_reserved(key)).map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Parses the reserved control attributes out of this message.
    #[must_use]
    pub fn reserved(&self) -> ReservedAttrs {
        ReservedAttrs::from_message(self)
    }

    /// Returns the underlying attribute map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.attrs
    }

    /// Borrows the underlying attribute map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.attrs
    }
}

/// Returns `true` when `key` is a reserved control attribute name (ends in `$`).
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    key.ends_with('$')
}

// ============================================================================
// SECTION: Reserved Attributes
// ============================================================================

/// Parsed view of a message's `$`-suffixed control attributes.
///
/// Fields are `None`/`false` when the corresponding key was absent or could
/// not be parsed into the expected shape; callers that need a hard failure
/// for malformed reserved attributes should check the raw value themselves.
#[derive(Debug, Clone, Default)]
pub struct ReservedAttrs {
    /// `id$` or `actid$`: caller-supplied in-flight action id (`local/tx` or bare local id).
    pub actid: Option<ActId>,
    /// `tx$`: transaction correlation id.
    pub tx: Option<TxId>,
    /// `default$`: fallback result when no pattern matches.
    pub default: Option<Value>,
    /// `gate$`: execute inside a dedicated sub-gate.
    pub gate: bool,
    /// `timeout$`: per-call timeout override, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// `fatal$`: failures terminate the instance.
    pub fatal: bool,
    /// `history$`: ordered action ids visited so far, for loop detection.
    pub history: Vec<String>,
    /// `meta$`: populated by the dispatcher; opaque to callers.
    pub meta: Option<Value>,
}

impl ReservedAttrs {
    /// Extracts reserved attributes from a message without mutating it.
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        let actid = message
            .get("id$")
            .or_else(|| message.get("actid$"))
            .and_then(Value::as_str)
            .map(ActId::from);
        let tx = message.get("tx$").and_then(Value::as_str).map(TxId::new);
        let default = message.get("default$").cloned();
        let gate = message.get("gate$").and_then(Value::as_bool).unwrap_or(false);
        let timeout_ms = message.get("timeout$").and_then(Value::as_u64);
        let fatal = message.get("fatal$").and_then(Value::as_bool).unwrap_or(false);
        let history = message
            .get("history$")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("action").and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let meta = message.get("meta$").cloned();

        Self { actid, tx, default, gate, timeout_ms, fatal, history, meta }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use serde_json::Value;
    use serde_json::json;

    use super::Message;

    fn msg(pairs: &[(&str, Value)]) -> Message {
        let mut m = Message::new();
        for (k, v) in pairs {
            m.set(*k, v.clone());
        }
        m
    }

    #[test]
    fn matchable_strips_reserved_keys() {
        let m = msg(&[("role", json!("math")), ("id$", json!("x")), ("tx$", json!("t"))]);
        let matchable = m.matchable();
        assert_eq!(matchable.len(), 1);
        assert!(matchable.contains_key("role"));
    }

    #[test]
    fn reserved_parses_history_action_ids() {
        let mut m = Message::new();
        m.set("history$", json!([{"action": "a1"}, {"action": "a2"}]));
        let reserved = m.reserved();
        assert_eq!(reserved.history, vec!["a1".to_string(), "a2".to_string()]);
    }

    #[test]
    fn merge_respects_other_wins_flag() {
        let mut base = msg(&[("x", json!(1))]);
        let patch = msg(&[("x", json!(2)), ("y", json!(3))]);

        let mut caller_wins = base.clone();
        caller_wins.merge(&patch, false);
        assert_eq!(caller_wins.get("x").unwrap(), &json!(1));
        assert_eq!(caller_wins.get("y").unwrap(), &json!(3));

        base.merge(&patch, true);
        assert_eq!(base.get("x").unwrap(), &json!(2));
    }
}
