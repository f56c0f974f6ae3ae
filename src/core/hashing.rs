// src/core/hashing.rs
// ============================================================================
// Module: Actiongate Canonical Encoding
// Description: RFC 8785 JSON canonicalization used to render pattern values.
// Purpose: Give non-string pattern values ("cmd: 1", "cmd: true") a single,
//          stable string form so canonical pattern strings compare equal
//          across calls regardless of key insertion order.
// Dependencies: serde, serde_jcs
// ============================================================================

//! ## Overview
//! Pattern terms may hold arbitrary JSON scalars. To compare and sort them
//! deterministically the dispatcher renders each value through RFC 8785
//! (JCS) canonicalization rather than `serde_json`'s default `Display`,
//! which does not guarantee stable key ordering for object-valued terms.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when canonicalizing a value to JSON.
#[derive(Debug, Error)]
pub enum CanonError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Returns the RFC 8785 canonical JSON string for a serializable value.
///
/// # Errors
///
/// Returns [`CanonError::Canonicalization`] when serialization fails.
pub fn canonical_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonError> {
    serde_jcs::to_string(value).map_err(|err| CanonError::Canonicalization(err.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use serde_json::json;

    use super::canonical_json_string;

    #[test]
    fn canonicalizes_object_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json_string(&a).unwrap(), canonical_json_string(&b).unwrap());
    }

    #[test]
    fn renders_scalars_directly() {
        assert_eq!(canonical_json_string(&json!(42)).unwrap(), "42");
        assert_eq!(canonical_json_string(&json!(true)).unwrap(), "true");
        assert_eq!(canonical_json_string(&json!("x")).unwrap(), "\"x\"");
    }
}
