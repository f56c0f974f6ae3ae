// src/core/mod.rs
// ============================================================================
// Module: Actiongate Core Types
// Description: Canonical message, pattern, identifier, and error types.
// Purpose: Provide stable, serializable building blocks shared by the
//          pattern index, dispatcher, and delegate layers.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Core types are plain data: [`Message`](message::Message), the matchable
//! [`Pattern`](pattern::Pattern) derived from it, the identifiers that name
//! actions and calls, and the [`ActError`](error::ActError) taxonomy raised
//! while dispatching. Nothing in this module depends on the runtime layer.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod error;
pub mod hashing;
pub mod identifiers;
pub mod message;
pub mod meta;
pub mod pattern;
pub mod stats;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ActError;
pub use error::ErrorKind;
pub use hashing::CanonError;
pub use hashing::canonical_json_string;
pub use identifiers::ActId;
pub use identifiers::ActionId;
pub use identifiers::DEFAULT_IDLEN;
pub use identifiers::IdGenerator;
pub use identifiers::InstanceTag;
pub use identifiers::TxId;
pub use message::Message;
pub use message::ReservedAttrs;
pub use message::is_reserved;
pub use meta::ActionMeta;
pub use meta::CallMeta;
pub use meta::PriorCtxt;
pub use pattern::Pattern;
pub use pattern::glob_match;
pub use stats::GlobalStats;
pub use stats::PatternStats;
pub use stats::PatternStatsSnapshot;
pub use stats::StatsSnapshot;
