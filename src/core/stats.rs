// src/core/stats.rs
// ============================================================================
// Module: Actiongate Stats
// Description: Global and per-pattern call counters with a bounded rolling
//              latency window.
// Purpose: Give `Instance` introspection into call volume, failure rate, and
//          latency without an external metrics dependency.
// Dependencies: std::sync, std::collections
// ============================================================================

//! ## Overview
//! Counters are plain atomics so they can be read without locking the
//! dispatcher. Per-pattern latency samples are kept in a bounded ring
//! buffer (`stats.size`) so memory use does not grow with call volume.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

// ============================================================================
// SECTION: Global Counters
// ============================================================================

/// Process-wide call counters: total calls, completions, failures, and
/// cache hits.
#[derive(Debug, Default)]
pub struct GlobalStats {
    /// Calls admitted to the dispatcher.
    pub calls: AtomicU64,
    /// Calls that completed, successfully or not.
    pub done: AtomicU64,
    /// Calls that completed with an error.
    pub fails: AtomicU64,
    /// Calls served from the action cache rather than executed.
    pub cache: AtomicU64,
}

impl GlobalStats {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a call admission.
    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed call, successful or not.
    pub fn record_done(&self, failed: bool) {
        self.done.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.fails.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a cache hit.
    pub fn record_cache_hit(&self) {
        self.cache.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            done: self.done.load(Ordering::Relaxed),
            fails: self.fails.load(Ordering::Relaxed),
            cache: self.cache.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of [`GlobalStats`] at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// See [`GlobalStats::calls`].
    pub calls: u64,
    /// See [`GlobalStats::done`].
    pub done: u64,
    /// See [`GlobalStats::fails`].
    pub fails: u64,
    /// See [`GlobalStats::cache`].
    pub cache: u64,
}

// ============================================================================
// SECTION: Per-Pattern Stats
// ============================================================================

/// Per-pattern call counters plus a bounded rolling window of elapsed
/// times, in milliseconds.
#[derive(Debug, Default)]
struct PatternEntry {
    /// Calls admitted for this pattern.
    calls: u64,
    /// Calls that completed, successfully or not.
    done: u64,
    /// Calls that completed with an error.
    fails: u64,
    /// Most recent elapsed times, oldest evicted first once `size` is reached.
    window: VecDeque<u64>,
}

/// Aggregated per-pattern statistics, keyed by canonical pattern string.
///
/// `size` bounds the rolling latency window kept per pattern (`stats.size`
/// in the options schema); `0` disables latency tracking entirely.
#[derive(Debug)]
pub struct PatternStats {
    /// Maximum latency samples retained per pattern; `0` disables tracking.
    size: usize,
    /// Per-pattern entries, keyed by canonical pattern string.
    entries: Mutex<BTreeMap<String, PatternEntry>>,
}

impl PatternStats {
    /// Creates a tracker that retains up to `size` latency samples per pattern.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self { size, entries: Mutex::new(BTreeMap::new()) }
    }

    /// Records a completed call for `pattern`, taking `elapsed_ms` to run.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    pub fn record(&self, pattern: &str, elapsed_ms: u64, failed: bool) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let entry = entries.entry(pattern.to_string()).or_default();
        entry.calls += 1;
        entry.done += 1;
        if failed {
            entry.fails += 1;
        }
        if self.size > 0 {
            entry.window.push_back(elapsed_ms);
            while entry.window.len() > self.size {
                entry.window.pop_front();
            }
        }
    }

    /// Returns the recorded counters and rolling mean latency for `pattern`,
    /// or `None` if the pattern has never been recorded.
    #[must_use]
    pub fn summary(&self, pattern: &str) -> Option<PatternStatsSnapshot> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(pattern)?;
        let mean_ms = if entry.window.is_empty() {
            0.0
        } else {
            entry.window.iter().sum::<u64>() as f64 / entry.window.len() as f64
        };
        Some(PatternStatsSnapshot { calls: entry.calls, done: entry.done, fails: entry.fails, mean_ms })
    }
}

/// Immutable snapshot of one pattern's counters and rolling mean latency.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PatternStatsSnapshot {
    /// Calls admitted for this pattern.
    pub calls: u64,
    /// Calls that completed, successfully or not.
    pub done: u64,
    /// Calls that completed with an error.
    pub fails: u64,
    /// Mean elapsed time, in milliseconds, over the retained window.
    pub mean_ms: f64,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only assertions are permitted.")]

    use super::GlobalStats;
    use super::PatternStats;

    #[test]
    fn global_stats_track_calls_and_failures() {
        let stats = GlobalStats::new();
        stats.record_call();
        stats.record_done(true);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.calls, 1);
        assert_eq!(snapshot.done, 1);
        assert_eq!(snapshot.fails, 1);
    }

    #[test]
    fn pattern_stats_window_is_bounded() {
        let stats = PatternStats::new(2);
        stats.record("role:math,cmd:sum", 10, false);
        stats.record("role:math,cmd:sum", 20, false);
        stats.record("role:math,cmd:sum", 30, false);
        let snapshot = stats.summary("role:math,cmd:sum").expect("pattern was recorded");
        assert_eq!(snapshot.calls, 3);
        assert_eq!(snapshot.done, 3);
        assert_eq!(snapshot.fails, 0);
        assert!((snapshot.mean_ms - 25.0).abs() < f64::EPSILON);
    }
}
