//! Approximated LRU: idle time from coarse clock ticks.

use crate::common::config::LRU_CLOCK_MAX;

/// Milliseconds an entry stamped at `stored` has been idle at tick `now`.
///
/// A `now` smaller than `stored` means the 24-bit clock wrapped once since
/// the stamp. More than one wrap is not distinguishable and not corrected.
#[inline]
pub fn idle_time_ms(now: u32, stored: u32, resolution_ms: u64) -> u64 {
    let now = (now & LRU_CLOCK_MAX) as u64;
    let stored = (stored & LRU_CLOCK_MAX) as u64;

    if now >= stored {
        (now - stored) * resolution_ms
    } else {
        (now + (LRU_CLOCK_MAX as u64 - stored)) * resolution_ms
    }
}
