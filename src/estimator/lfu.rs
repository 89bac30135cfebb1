//! Approximated LFU: a Morris-style logarithmic counter with time decay.
//!
//! Each entry keeps an 8-bit counter and the minute it was last decremented.
//! Hits bump the counter with a probability that shrinks as it grows, and
//! idle minutes pull it back down, so old hot keys eventually become
//! evictable again.

use rand::Rng;

use crate::common::config::{LFU_INIT_VAL, LFU_MINUTES_MAX};
use crate::estimator::AccessMeta;

/// Logarithmically increment `counter`.
///
/// Saturates at 255. Below that, increments with probability
/// `1 / ((counter - LFU_INIT_VAL) * log_factor + 1)`.
pub fn log_incr<R: Rng + ?Sized>(counter: u8, log_factor: u32, rng: &mut R) -> u8 {
    if counter == u8::MAX {
        return u8::MAX;
    }

    let r: f64 = rng.gen();
    let baseval = counter.saturating_sub(LFU_INIT_VAL) as f64;
    let p = 1.0 / (baseval * log_factor as f64 + 1.0);

    if r < p {
        counter + 1
    } else {
        counter
    }
}

/// Minutes since `ldt`, assuming at most one wrap of the 16-bit clock.
#[inline]
pub fn time_elapsed(now_minutes: u16, ldt: u16) -> u32 {
    if now_minutes >= ldt {
        (now_minutes - ldt) as u32
    } else {
        LFU_MINUTES_MAX as u32 - ldt as u32 + now_minutes as u32
    }
}

/// The counter after applying decay for the idle periods since `meta.ldt()`.
///
/// This is a view: `meta` is not modified. The stored counter only changes
/// when the entry is actually accessed.
pub fn decayed_counter(meta: &AccessMeta, now_minutes: u16, decay_minutes: u32) -> u8 {
    let periods = if decay_minutes > 0 {
        time_elapsed(now_minutes, meta.ldt()) / decay_minutes
    } else {
        0
    };

    if periods == 0 {
        return meta.counter;
    }
    if periods >= meta.counter as u32 {
        0
    } else {
        meta.counter - periods as u8
    }
}
