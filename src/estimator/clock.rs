//! Coarse clocks for recency and frequency bookkeeping.
//!
//! [`LruClock`] keeps a cached 24-bit tick that the host refreshes from its
//! periodic cron. Readers pay a single atomic load instead of a syscall.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::common::config::LRU_CLOCK_MAX;
use crate::common::EvictionConfig;

/// Source of wall-clock milliseconds.
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Reads the operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to. Used by tests and simulations.
///
/// # Example
/// ```
/// use maxmem::estimator::{ManualTimeSource, TimeSource};
/// use std::time::Duration;
///
/// let time = ManualTimeSource::new(1_000);
/// time.advance(Duration::from_secs(2));
/// assert_eq!(time.now_ms(), 3_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now_ms: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::Relaxed);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::Relaxed);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

/// The coarse LRU clock shared by the store and the evictor.
///
/// # Thread Safety
/// `cached` is written by the host's refresher and read by the command path.
/// Both sides use relaxed atomics: a tick that is one refresh stale only
/// shifts idle times by one resolution step.
pub struct LruClock {
    cached: AtomicU32,
    resolution_ms: u64,
    hz: u32,
    time: Arc<dyn TimeSource>,
}

impl LruClock {
    /// Create a clock and prime the cached tick.
    ///
    /// # Panics
    /// Panics if `resolution_ms` or `hz` is 0.
    pub fn new(time: Arc<dyn TimeSource>, resolution_ms: u64, hz: u32) -> Self {
        assert!(resolution_ms > 0, "resolution_ms must be > 0");
        assert!(hz > 0, "hz must be > 0");

        let clock = Self {
            cached: AtomicU32::new(0),
            resolution_ms,
            hz,
            time,
        };
        clock.refresh();
        clock
    }

    /// Build a clock using the resolution and refresh rate from `config`.
    pub fn from_config(config: &EvictionConfig, time: Arc<dyn TimeSource>) -> Self {
        Self::new(time, config.lru_clock_resolution_ms, config.hz)
    }

    /// Compute the tick straight from the time source.
    pub fn compute_ticks(&self) -> u32 {
        ((self.time.now_ms() / self.resolution_ms) & LRU_CLOCK_MAX as u64) as u32
    }

    /// Recompute and publish the cached tick. Called by the host cron.
    pub fn refresh(&self) {
        self.cached.store(self.compute_ticks(), Ordering::Relaxed);
    }

    /// Current tick.
    ///
    /// Uses the cached value when the refresh period is at least as fine as
    /// the resolution, and reads the time source otherwise.
    #[inline]
    pub fn now(&self) -> u32 {
        if 1000 / self.hz as u64 <= self.resolution_ms {
            self.cached.load(Ordering::Relaxed)
        } else {
            self.compute_ticks()
        }
    }

    /// Current time in minutes, truncated to 16 bits.
    #[inline]
    pub fn minutes(&self) -> u16 {
        ((self.time.now_ms() / 1000 / 60) & 0xFFFF) as u16
    }

    #[inline]
    pub fn resolution_ms(&self) -> u64 {
        self.resolution_ms
    }
}

impl std::fmt::Debug for LruClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruClock")
            .field("cached", &self.cached.load(Ordering::Relaxed))
            .field("resolution_ms", &self.resolution_ms)
            .field("hz", &self.hz)
            .finish()
    }
}
