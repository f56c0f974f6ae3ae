// src/runtime/options.rs
// ============================================================================
// Module: Actiongate Options
// Description: Frozen-after-init option tree governing dispatcher behavior.
// Purpose: Give every tunable a typed home instead of a loose JSON blob.
// Dependencies: std::time
// ============================================================================

//! ## Overview
//! [`Options`] starts from [`Options::default`], is deep-merged against a
//! constructor argument, then against any number of `set_options(patch)`
//! calls made before the instance's first dispatch. Once the instance
//! emits its first `ready`, the tree is frozen: later `set_options` calls
//! are no-ops.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Strict Switches
// ============================================================================

/// The `strict.*` switches described in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrictOptions {
    /// Enforce object/array results (`strict.result`).
    pub result: bool,
    /// Delegate-supplied fixed args win over caller-supplied ones (`strict.fixedargs`).
    pub fixedargs: bool,
    /// Overrides require exact canonical-pattern equality (`strict.add`).
    pub add: bool,
    /// When `false`, a missing action returns an empty object instead of an error (`strict.find`).
    pub find: bool,
    /// Loop-depth ceiling (`strict.maxloop`).
    pub maxloop: u32,
}

impl Default for StrictOptions {
    fn default() -> Self {
        Self { result: true, fixedargs: false, add: false, find: true, maxloop: 11 }
    }
}

// ============================================================================
// SECTION: Action Cache Options
// ============================================================================

/// The `actcache.*` switches described in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActCacheOptions {
    /// Whether the action cache is consulted/populated at all.
    pub active: bool,
    /// Maximum number of entries retained (bounded LRU).
    pub size: usize,
}

impl Default for ActCacheOptions {
    fn default() -> Self {
        Self { active: true, size: 11_111 }
    }
}

// ============================================================================
// SECTION: Trace Options
// ============================================================================

/// The `trace.*` switches described in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceOptions {
    /// Log every admitted/completed task, including late timeout completions.
    pub act: bool,
    /// Include a synthesized call stack in error logs.
    pub stack: bool,
    /// Log calls that resolve to no action.
    pub unknown: bool,
}

// ============================================================================
// SECTION: Stats Options
// ============================================================================

/// The `stats.*` switches described in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsOptions {
    /// Rolling latency window size, per pattern. `0` disables latency tracking.
    pub size: usize,
    /// Interval, in milliseconds, between periodic stats log lines. `0` disables.
    pub interval_ms: u64,
    /// Whether the periodic stats logger runs at all.
    pub running: bool,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self { size: 100, interval_ms: 60_000, running: false }
    }
}

// ============================================================================
// SECTION: Debug Options
// ============================================================================

/// The `debug.*` switches described in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugOptions {
    /// Re-throw (propagate) errors that would otherwise only be logged.
    pub fragile: bool,
    /// Keep the instance alive after a fatal error instead of dying.
    pub undead: bool,
    /// Capture the caller's source location on every `act`.
    pub act_caller: bool,
    /// Record `callpoint` on every `add`.
    pub callpoint: bool,
    /// Abbreviate log lines.
    pub short_logs: bool,
}

// ============================================================================
// SECTION: Internal Options
// ============================================================================

/// The `internal.*` switches described in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalOptions {
    /// When `false` (the default per spec §9's resolved open question), a
    /// registration over the catch-all pattern is never treated as an
    /// override chain — the catch-all is left untouched and the new
    /// registration stands alone.
    pub catchall: bool,
}

impl Default for InternalOptions {
    fn default() -> Self {
        Self { catchall: false }
    }
}

// ============================================================================
// SECTION: Legacy Options
// ============================================================================

/// The `legacy.*` compatibility switches described in spec §6. None change
/// this crate's behavior today; they exist so callers porting configuration
/// from an existing deployment have somewhere to put them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LegacyOptions {
    /// Use legacy numeric error codes in logs.
    pub error_codes: bool,
    /// Use legacy validator semantics.
    pub validate: bool,
    /// Use legacy log line formatting.
    pub logging: bool,
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// The full option tree.
#[derive(Debug, Clone)]
pub struct Options {
    /// Instance tag, used in the identifier format and in logs.
    pub tag: String,
    /// Length, in hex characters, of generated local identifiers.
    pub idlen: usize,
    /// Default per-action timeout when no `timeout$` or `tm` is given.
    pub timeout: Duration,
    /// Whether pattern matching runs in glob mode (`*`, `?` wildcards).
    pub glob: bool,
    /// `strict.*` switches.
    pub strict: StrictOptions,
    /// `actcache.*` switches.
    pub actcache: ActCacheOptions,
    /// `trace.*` switches.
    pub trace: TraceOptions,
    /// `stats.*` switches.
    pub stats: StatsOptions,
    /// `debug.*` switches.
    pub debug: DebugOptions,
    /// `internal.*` switches.
    pub internal: InternalOptions,
    /// `legacy.*` switches.
    pub legacy: LegacyOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tag: "-".to_string(),
            idlen: crate::core::DEFAULT_IDLEN,
            timeout: Duration::from_millis(22_222),
            glob: false,
            strict: StrictOptions::default(),
            actcache: ActCacheOptions::default(),
            trace: TraceOptions::default(),
            stats: StatsOptions::default(),
            debug: DebugOptions::default(),
            internal: InternalOptions::default(),
            legacy: LegacyOptions::default(),
        }
    }
}

/// A sparse patch applied over an existing [`Options`] tree. Any field left
/// `None` keeps its current value; `Some` fields overwrite wholesale (the
/// nested option groups are not merged field-by-field, matching how the
/// teacher's config layer treats its own sub-tables).
#[derive(Debug, Clone, Default)]
pub struct OptionsPatch {
    /// See [`Options::tag`].
    pub tag: Option<String>,
    /// See [`Options::idlen`].
    pub idlen: Option<usize>,
    /// See [`Options::timeout`].
    pub timeout: Option<Duration>,
    /// See [`Options::glob`].
    pub glob: Option<bool>,
    /// See [`Options::strict`].
    pub strict: Option<StrictOptions>,
    /// See [`Options::actcache`].
    pub actcache: Option<ActCacheOptions>,
    /// See [`Options::trace`].
    pub trace: Option<TraceOptions>,
    /// See [`Options::stats`].
    pub stats: Option<StatsOptions>,
    /// See [`Options::debug`].
    pub debug: Option<DebugOptions>,
    /// See [`Options::internal`].
    pub internal: Option<InternalOptions>,
    /// See [`Options::legacy`].
    pub legacy: Option<LegacyOptions>,
}

impl Options {
    /// Applies `patch` over `self`, overwriting any field the patch sets.
    pub fn apply(&mut self, patch: OptionsPatch) {
        if let Some(tag) = patch.tag {
            self.tag = tag;
        }
        if let Some(idlen) = patch.idlen {
            self.idlen = idlen;
        }
        if let Some(timeout) = patch.timeout {
            self.timeout = timeout;
        }
        if let Some(glob) = patch.glob {
            self.glob = glob;
        }
        if let Some(strict) = patch.strict {
            self.strict = strict;
        }
        if let Some(actcache) = patch.actcache {
            self.actcache = actcache;
        }
        if let Some(trace) = patch.trace {
            self.trace = trace;
        }
        if let Some(stats) = patch.stats {
            self.stats = stats;
        }
        if let Some(debug) = patch.debug {
            self.debug = debug;
        }
        if let Some(internal) = patch.internal {
            self.internal = internal;
        }
        if let Some(legacy) = patch.legacy {
            self.legacy = legacy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InternalOptions;
    use super::Options;
    use super::OptionsPatch;

    #[test]
    fn defaults_match_spec_resolved_open_questions() {
        let options = Options::default();
        assert!(!options.internal.catchall, "catchall override defaults to off per spec §9");
        assert_eq!(options.strict.maxloop, 11);
    }

    #[test]
    fn apply_overwrites_only_patched_fields() {
        let mut options = Options::default();
        let original_idlen = options.idlen;
        options.apply(OptionsPatch { internal: Some(InternalOptions { catchall: true }), ..OptionsPatch::default() });
        assert!(options.internal.catchall);
        assert_eq!(options.idlen, original_idlen);
    }
}
