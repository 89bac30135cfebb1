//! Configuration constants and the eviction configuration surface.

use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};
use crate::storage::KeySource;

/// Number of slots in the eviction pool.
pub const EVPOOL_SIZE: usize = 16;

/// Capacity of the per-slot scratch buffer used for short keys.
///
/// Keys longer than this are heap-allocated for the slot instead.
pub const EVPOOL_CACHED_KEY_SIZE: usize = 255;

/// Largest value the 24-bit LRU clock can hold.
pub const LRU_CLOCK_MAX: u32 = (1 << 24) - 1;

/// Default LRU clock resolution in milliseconds.
pub const LRU_CLOCK_RESOLUTION_MS: u64 = 1000;

/// Initial LFU counter for new entries.
///
/// Non-zero so freshly written keys aren't the first thing evicted.
pub const LFU_INIT_VAL: u8 = 5;

/// Largest value the 16-bit LFU minute clock can hold.
pub const LFU_MINUTES_MAX: u16 = u16::MAX;

/// In lazy eviction mode, re-check the budget after this many evictions.
pub const LAZY_EVICTION_CHECK_INTERVAL: u64 = 16;

/// Values larger than this (bytes) are freed on a background worker when
/// deleted lazily. Smaller values are cheaper to free inline.
pub const LAZYFREE_THRESHOLD: usize = 64;

/// Upper bound of a single wait for lazy-free progress.
pub const LAZYFREE_WAIT_STEP_MS: u64 = 1;

/// Wait steps without any lazy-free job finishing before the evictor stops
/// waiting on the backlog.
pub const LAZYFREE_MAX_STALLED_STEPS: u32 = 1000;

/// The `maxmemory-policy` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionPolicy {
    /// Never evict; reject memory-growing commands instead.
    #[default]
    NoEviction,
    AllKeysLru,
    VolatileLru,
    AllKeysLfu,
    VolatileLfu,
    AllKeysRandom,
    VolatileRandom,
    VolatileTtl,
}

impl EvictionPolicy {
    /// All policies, in the order they are usually documented.
    pub const ALL: [EvictionPolicy; 8] = [
        EvictionPolicy::VolatileLru,
        EvictionPolicy::VolatileLfu,
        EvictionPolicy::VolatileRandom,
        EvictionPolicy::VolatileTtl,
        EvictionPolicy::AllKeysLru,
        EvictionPolicy::AllKeysLfu,
        EvictionPolicy::AllKeysRandom,
        EvictionPolicy::NoEviction,
    ];

    /// The configuration name of the policy.
    pub fn name(&self) -> &'static str {
        match self {
            EvictionPolicy::NoEviction => "noeviction",
            EvictionPolicy::AllKeysLru => "allkeys-lru",
            EvictionPolicy::VolatileLru => "volatile-lru",
            EvictionPolicy::AllKeysLfu => "allkeys-lfu",
            EvictionPolicy::VolatileLfu => "volatile-lfu",
            EvictionPolicy::AllKeysRandom => "allkeys-random",
            EvictionPolicy::VolatileRandom => "volatile-random",
            EvictionPolicy::VolatileTtl => "volatile-ttl",
        }
    }

    #[inline]
    pub fn is_lru(&self) -> bool {
        matches!(self, EvictionPolicy::AllKeysLru | EvictionPolicy::VolatileLru)
    }

    #[inline]
    pub fn is_lfu(&self) -> bool {
        matches!(self, EvictionPolicy::AllKeysLfu | EvictionPolicy::VolatileLfu)
    }

    #[inline]
    pub fn is_random(&self) -> bool {
        matches!(
            self,
            EvictionPolicy::AllKeysRandom | EvictionPolicy::VolatileRandom
        )
    }

    /// Whether victims are chosen through the eviction pool.
    #[inline]
    pub fn uses_pool(&self) -> bool {
        self.is_lru() || self.is_lfu() || *self == EvictionPolicy::VolatileTtl
    }

    /// Which part of the keyspace the policy samples from.
    pub fn source(&self) -> KeySource {
        match self {
            EvictionPolicy::AllKeysLru
            | EvictionPolicy::AllKeysLfu
            | EvictionPolicy::AllKeysRandom
            | EvictionPolicy::NoEviction => KeySource::AllKeys,
            EvictionPolicy::VolatileLru
            | EvictionPolicy::VolatileLfu
            | EvictionPolicy::VolatileRandom
            | EvictionPolicy::VolatileTtl => KeySource::Volatile,
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvictionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        EvictionPolicy::ALL
            .iter()
            .copied()
            .find(|p| p.name() == lower)
            .ok_or_else(|| Error::InvalidPolicy(s.to_string()))
    }
}

/// Read-only inputs of the eviction engine.
///
/// # Example
/// ```
/// use maxmem::{EvictionConfig, EvictionPolicy};
///
/// let config = EvictionConfig {
///     policy: "allkeys-lru".parse().unwrap(),
///     maxmemory: 64 * 1024 * 1024,
///     ..EvictionConfig::default()
/// };
/// assert_eq!(config.policy, EvictionPolicy::AllKeysLru);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EvictionConfig {
    pub policy: EvictionPolicy,

    /// Memory ceiling in bytes. `0` means unlimited.
    pub maxmemory: usize,

    /// Keys sampled per database on each pool refill.
    pub maxmemory_samples: usize,

    /// Slows down LFU counter growth; higher means more hits per step.
    pub lfu_log_factor: u32,

    /// Minutes per one-step LFU decay. `0` disables decay.
    pub lfu_decay_time: u32,

    /// Hand deleted values to the lazy-free worker instead of freeing inline.
    pub lazyfree_lazy_eviction: bool,

    /// Replicas leave eviction to their primary.
    pub replica_ignore_maxmemory: bool,

    /// Record latency samples at or above this many milliseconds. `0` disables.
    pub latency_monitor_threshold_ms: u64,

    /// Milliseconds per LRU clock tick.
    pub lru_clock_resolution_ms: u64,

    /// How many times per second the host refreshes the cached clock.
    pub hz: u32,

    /// Seed for sampling and LFU increments. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            policy: EvictionPolicy::NoEviction,
            maxmemory: 0,
            maxmemory_samples: 5,
            lfu_log_factor: 10,
            lfu_decay_time: 1,
            lazyfree_lazy_eviction: false,
            replica_ignore_maxmemory: true,
            latency_monitor_threshold_ms: 0,
            lru_clock_resolution_ms: LRU_CLOCK_RESOLUTION_MS,
            hz: 10,
            rng_seed: None,
        }
    }
}

impl EvictionConfig {
    /// Check values that would make the engine misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.maxmemory_samples == 0 {
            return Err(Error::InvalidConfig("maxmemory-samples must be > 0"));
        }
        if self.hz == 0 {
            return Err(Error::InvalidConfig("hz must be > 0"));
        }
        if self.lru_clock_resolution_ms == 0 {
            return Err(Error::InvalidConfig("lru clock resolution must be > 0"));
        }
        Ok(())
    }
}
