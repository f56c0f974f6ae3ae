// src/core/error.rs
// ============================================================================
// Module: Actiongate Error Taxonomy
// Description: Dispatch-time error kinds and the envelope carried with each.
// Purpose: Give every dispatch failure a stable kind, message, and call context.
// Dependencies: serde_json, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Every failure reaching a caller's continuation is an [`ActError`]. Kinds
//! mirror spec §7's taxonomy one-to-one; [`ActError::orig`] preserves a
//! wrapped handler error exactly once (errors are never double-wrapped, per
//! spec §7's propagation rule).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ActId;
use crate::core::pattern::Pattern;

// ============================================================================
// SECTION: Error Kind
// ============================================================================

/// Stable error kind, one variant per spec §7 row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `add` called with no matchable keys.
    AddEmptyPattern,
    /// No pattern matched and no usable `default$` was supplied.
    ActNotFound,
    /// `default$` was present but not an object or array.
    ActDefaultBad,
    /// The message failed the resolved action's validator.
    ActInvalidMsg,
    /// `history$` depth exceeded `strict.maxloop`.
    ActLoop,
    /// A successful result violated `strict.result`.
    ResultNotObjArr,
    /// The handler returned an error.
    ActExecute,
    /// The caller's continuation panicked-equivalent (returned an error via a panic hook).
    ActCallback,
    /// Dispatch was attempted after the instance closed.
    InstanceClosed,
    /// The gated executor timed out the call.
    Timeout,
    /// A required plugin dependency was not registered.
    PluginRequired,
    /// A named plugin export was not found.
    ExportNotFound,
}

impl ErrorKind {
    /// Returns the stable, lowercase wire name for this kind.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AddEmptyPattern => "add_empty_pattern",
            Self::ActNotFound => "act_not_found",
            Self::ActDefaultBad => "act_default_bad",
            Self::ActInvalidMsg => "act_invalid_msg",
            Self::ActLoop => "act_loop",
            Self::ResultNotObjArr => "result_not_objarr",
            Self::ActExecute => "act_execute",
            Self::ActCallback => "act_callback",
            Self::InstanceClosed => "instance-closed",
            Self::Timeout => "TIMEOUT",
            Self::PluginRequired => "plugin_required",
            Self::ExportNotFound => "export_not_found",
        }
    }
}

// ============================================================================
// SECTION: Action Error
// ============================================================================

/// A dispatch-time error, carrying the envelope spec §7 requires: kind,
/// message, pattern (if known), and the call's `meta$` snapshot.
#[derive(Debug, Clone, Error)]
#[error("{}: {message}", kind.code())]
pub struct ActError {
    /// Stable error kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Pattern associated with the call, if resolution got that far.
    pub pattern: Option<Pattern>,
    /// In-flight action id of the call that failed, if assigned yet.
    pub actid: Option<ActId>,
    /// Opaque call metadata (`meta$`) snapshot at time of failure.
    pub meta: Option<Value>,
    /// The original error this one wraps, if any. Set at most once: an
    /// error that already carries an `orig` is never wrapped again.
    pub orig: Option<Box<ActError>>,
}

impl ActError {
    /// Creates a new error with no pattern, action id, meta, or wrapped origin.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), pattern: None, actid: None, meta: None, orig: None }
    }

    /// Attaches the pattern associated with the call.
    #[must_use]
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Attaches the in-flight action id of the call.
    #[must_use]
    pub fn with_actid(mut self, actid: ActId) -> Self {
        self.actid = Some(actid);
        self
    }

    /// Attaches the call's `meta$` snapshot.
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Wraps `self` as the `orig` of a new error of kind `act_execute`, but
    /// only if `self` is not already a wrapper (never double-wrap, per
    /// spec §7).
    #[must_use]
    pub fn wrap_execute(self, message: impl Into<String>) -> Self {
        if self.orig.is_some() {
            return self;
        }
        let pattern = self.pattern.clone();
        let actid = self.actid.clone();
        let meta = self.meta.clone();
        let mut wrapped = Self::new(ErrorKind::ActExecute, message);
        wrapped.pattern = pattern;
        wrapped.actid = actid;
        wrapped.meta = meta;
        wrapped.orig = Some(Box::new(self));
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::ActError;
    use super::ErrorKind;

    #[test]
    fn wrap_execute_does_not_double_wrap() {
        let base = ActError::new(ErrorKind::ActExecute, "boom");
        let once = base.wrap_execute("wrapped once");
        assert!(once.orig.is_some());
        let twice = once.wrap_execute("wrapped twice");
        assert_eq!(twice.message, "wrapped once");
    }

    #[test]
    fn code_matches_spec_wire_names() {
        assert_eq!(ErrorKind::ActNotFound.code(), "act_not_found");
        assert_eq!(ErrorKind::Timeout.code(), "TIMEOUT");
        assert_eq!(ErrorKind::InstanceClosed.code(), "instance-closed");
    }
}
