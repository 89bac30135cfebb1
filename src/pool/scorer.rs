//! Turning sampled metadata into eviction scores.

use crate::common::EvictionPolicy;
use crate::estimator::{lfu, lru, LruClock};
use crate::storage::Sample;

/// Scores samples for one pool refill. Larger scores are evicted first.
///
/// The clock is read once when the scorer is built, so every sample of a
/// refill is measured against the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scorer {
    /// Idle time in milliseconds.
    Lru { now: u32, resolution_ms: u64 },
    /// `255 - decayed counter`.
    Lfu { now_minutes: u16, decay_minutes: u32 },
    /// Sooner expiration scores higher.
    Ttl,
}

impl Scorer {
    /// The scorer for a pool-based policy, or `None` for the others.
    pub fn for_policy(policy: EvictionPolicy, clock: &LruClock, decay_minutes: u32) -> Option<Self> {
        if policy.is_lru() {
            Some(Scorer::Lru {
                now: clock.now(),
                resolution_ms: clock.resolution_ms(),
            })
        } else if policy.is_lfu() {
            Some(Scorer::Lfu {
                now_minutes: clock.minutes(),
                decay_minutes,
            })
        } else if policy == EvictionPolicy::VolatileTtl {
            Some(Scorer::Ttl)
        } else {
            None
        }
    }

    pub fn score(&self, sample: &Sample) -> u64 {
        match *self {
            Scorer::Lru { now, resolution_ms } => {
                lru::idle_time_ms(now, sample.meta.timestamp, resolution_ms)
            }
            Scorer::Lfu {
                now_minutes,
                decay_minutes,
            } => 255 - lfu::decayed_counter(&sample.meta, now_minutes, decay_minutes) as u64,
            Scorer::Ttl => u64::MAX - sample.expire_at_ms.unwrap_or(u64::MAX),
        }
    }
}
