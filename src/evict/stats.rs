//! Eviction statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by the evictor.
///
/// All fields are atomic so a stats reporter on another thread can read
/// them while the command path updates them.
///
/// # Memory Ordering
/// We use `Ordering::Relaxed` for all operations because:
/// - We only need atomicity (no partial updates)
/// - We don't need synchronization between different counters
/// - Statistics are "eventually consistent" - exact ordering doesn't matter
///
/// # Example
/// ```
/// use maxmem::EvictionStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = EvictionStats::new();
/// stats.evicted_keys.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().evicted_keys, 1);
/// ```
#[derive(Debug, Default)]
pub struct EvictionStats {
    /// Keys deleted by eviction since startup. Never decreases.
    pub evicted_keys: AtomicU64,

    /// Cycles that had to evict (budget was exceeded on entry).
    pub eviction_cycles: AtomicU64,

    /// Cycles that ended without meeting the budget.
    pub rejected_cycles: AtomicU64,

    /// Bytes freed by the most recent eviction cycle.
    pub last_cycle_bytes_freed: AtomicU64,

    /// Bytes freed by all eviction cycles.
    pub total_bytes_freed: AtomicU64,
}

impl EvictionStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    ///
    /// This returns a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            evicted_keys: self.evicted_keys.load(Ordering::Relaxed),
            eviction_cycles: self.eviction_cycles.load(Ordering::Relaxed),
            rejected_cycles: self.rejected_cycles.load(Ordering::Relaxed),
            last_cycle_bytes_freed: self.last_cycle_bytes_freed.load(Ordering::Relaxed),
            total_bytes_freed: self.total_bytes_freed.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.evicted_keys.store(0, Ordering::Relaxed);
        self.eviction_cycles.store(0, Ordering::Relaxed);
        self.rejected_cycles.store(0, Ordering::Relaxed);
        self.last_cycle_bytes_freed.store(0, Ordering::Relaxed);
        self.total_bytes_freed.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_cycle(&self, bytes_freed: usize, converged: bool) {
        self.eviction_cycles.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_bytes_freed
            .store(bytes_freed as u64, Ordering::Relaxed);
        self.total_bytes_freed
            .fetch_add(bytes_freed as u64, Ordering::Relaxed);
        if !converged {
            self.rejected_cycles.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of eviction statistics.
///
/// Unlike `EvictionStats`, this is not atomic and can be safely
/// printed, compared, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub evicted_keys: u64,
    pub eviction_cycles: u64,
    pub rejected_cycles: u64,
    pub last_cycle_bytes_freed: u64,
    pub total_bytes_freed: u64,
}

impl StatsSnapshot {
    /// Average keys evicted per cycle (0.0 when no cycle ran).
    pub fn keys_per_cycle(&self) -> f64 {
        if self.eviction_cycles == 0 {
            0.0
        } else {
            self.evicted_keys as f64 / self.eviction_cycles as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ evicted_keys: {}, cycles: {}, rejected: {}, last_freed: {}B }}",
            self.evicted_keys,
            self.eviction_cycles,
            self.rejected_cycles,
            self.last_cycle_bytes_freed
        )
    }
}
