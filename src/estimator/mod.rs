//! Recency/frequency estimation.
//!
//! Every entry carries a small [`AccessMeta`] instead of a position in a
//! global list. The evictor turns that metadata into a score:
//! - [`lru`] - idle time from the coarse [`LruClock`]
//! - [`lfu`] - Morris-style log counter with lazy time decay
//!
//! [`Estimator`] bundles the clock with the LFU tunables and is what the
//! store calls on every access.

mod clock;
pub mod lfu;
pub mod lru;
mod meta;

use std::sync::Arc;

use rand::Rng;

pub use clock::{LruClock, ManualTimeSource, SystemTimeSource, TimeSource};
pub use meta::AccessMeta;

use crate::common::config::LFU_INIT_VAL;
use crate::common::EvictionConfig;

/// Maintains access metadata for the active policy family.
#[derive(Debug, Clone)]
pub struct Estimator {
    clock: Arc<LruClock>,
    lfu: bool,
    lfu_log_factor: u32,
    lfu_decay_time: u32,
}

impl Estimator {
    pub fn new(clock: Arc<LruClock>, lfu: bool, lfu_log_factor: u32, lfu_decay_time: u32) -> Self {
        Self {
            clock,
            lfu,
            lfu_log_factor,
            lfu_decay_time,
        }
    }

    /// Build an estimator matching the policy and tunables in `config`.
    pub fn from_config(config: &EvictionConfig, clock: Arc<LruClock>) -> Self {
        Self::new(
            clock,
            config.policy.is_lfu(),
            config.lfu_log_factor,
            config.lfu_decay_time,
        )
    }

    #[inline]
    pub fn clock(&self) -> &Arc<LruClock> {
        &self.clock
    }

    #[inline]
    pub fn is_lfu(&self) -> bool {
        self.lfu
    }

    /// Metadata for a newly created entry.
    pub fn new_meta(&self) -> AccessMeta {
        if self.lfu {
            AccessMeta::lfu(self.clock.minutes(), LFU_INIT_VAL)
        } else {
            AccessMeta::lru(self.clock.now())
        }
    }

    /// Record an access to an entry.
    ///
    /// In LFU mode this is the only place the stored counter changes: pending
    /// decay is applied first, then the log increment, then the minute stamp.
    pub fn touch<R: Rng + ?Sized>(&self, meta: &mut AccessMeta, rng: &mut R) {
        if self.lfu {
            let now = self.clock.minutes();
            let counter = lfu::decayed_counter(meta, now, self.lfu_decay_time);
            let counter = lfu::log_incr(counter, self.lfu_log_factor, rng);
            *meta = AccessMeta::lfu(now, counter);
        } else {
            *meta = AccessMeta::lru(self.clock.now());
        }
    }

    /// Idle time of an LRU-mode entry.
    pub fn idle_time_ms(&self, meta: &AccessMeta) -> u64 {
        lru::idle_time_ms(self.clock.now(), meta.timestamp, self.clock.resolution_ms())
    }

    /// Current decayed counter of an LFU-mode entry. Does not modify `meta`.
    pub fn decayed_counter(&self, meta: &AccessMeta) -> u8 {
        lfu::decayed_counter(meta, self.clock.minutes(), self.lfu_decay_time)
    }
}
