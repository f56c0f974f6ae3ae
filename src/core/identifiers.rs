// src/core/identifiers.rs
// ============================================================================
// Module: Actiongate Identifiers
// Description: Canonical opaque identifiers for actions, transactions, and calls.
// Purpose: Provide strongly typed, serializable ids with stable string forms.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as strings. The dispatcher never
//! inspects their internal structure beyond the `local/tx` split it runs on
//! a caller-supplied `id$`/`actid$` to recover the transaction id (see
//! [`ActId::split`]).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Action Identifier
// ============================================================================

/// Local action identifier, unique within a process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    /// Wraps an existing string as an action id without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ActionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Transaction Identifier
// ============================================================================

/// Transaction correlation id propagated through a prior chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    /// Wraps an existing string as a transaction id without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TxId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TxId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: In-Flight Action Identifier (local/tx)
// ============================================================================

/// Action id as it travels with a message: `<local>/<tx>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActId(String);

impl ActId {
    /// Builds an in-flight action id from its local and transaction parts.
    #[must_use]
    pub fn from_parts(local: &ActionId, tx: &TxId) -> Self {
        Self(format!("{local}/{tx}"))
    }

    /// Splits an in-flight action id on its first `/` into `(local, tx)`.
    ///
    /// Returns `None` when the value has no separator.
    #[must_use]
    pub fn split(&self) -> Option<(ActionId, TxId)> {
        let (local, tx) = self.0.split_once('/')?;
        Some((ActionId::new(local), TxId::new(tx)))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ActId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ActId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// SECTION: Instance Tag
// ============================================================================

/// Short instance tag used in the full identifier format and in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceTag(String);

impl InstanceTag {
    /// Creates a new instance tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InstanceTag {
    fn default() -> Self {
        Self("-".to_string())
    }
}

impl fmt::Display for InstanceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Identifier Generator
// ============================================================================

/// Default length, in hex characters, of generated local identifiers.
pub const DEFAULT_IDLEN: usize = 12;

/// Generates process-unique hex identifiers without relying on an external
/// randomness source.
///
/// Each call hashes a monotonic counter together with the process id and a
/// per-generator seed, then truncates the digest to `idlen` hex characters.
/// This mirrors the teacher crate's use of `Sha256` for deterministic
/// digests, but is seeded per generator instance so two generators (e.g.
/// two `Instance`s in the same process) do not collide.
#[derive(Debug)]
pub struct IdGenerator {
    /// Monotonic counter, incremented on every generated id.
    counter: AtomicU64,
    /// Per-generator seed, mixed into every digest.
    seed: u64,
}

impl IdGenerator {
    /// Creates a new generator seeded from the process id and a caller
    /// supplied salt (e.g. the instance creation timestamp).
    #[must_use]
    pub fn new(salt: u64) -> Self {
        Self {
            counter: AtomicU64::new(0),
            seed: u64::from(std::process::id()) ^ salt,
        }
    }

    /// Generates the next identifier, `idlen` hex characters long.
    #[must_use]
    pub fn next_id(&self, idlen: usize) -> ActionId {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(counter.to_le_bytes());
        let digest = hasher.finalize();
        ActionId::new(hex_prefix(&digest, idlen))
    }
}

/// Renders the first `len` hex characters of `bytes` (two characters per
/// byte), lower-cased.
fn hex_prefix(bytes: &[u8], len: usize) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(len);
    for byte in bytes {
        if out.len() >= len {
            break;
        }
        out.push(HEX[(byte >> 4) as usize] as char);
        if out.len() < len {
            out.push(HEX[(byte & 0x0f) as usize] as char);
        }
    }
    out
}
