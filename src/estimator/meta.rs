//! Per-entry access metadata.

use crate::common::config::LRU_CLOCK_MAX;

/// Recency/frequency metadata stored with every entry.
///
/// The meaning of the fields depends on the active policy family:
///
/// | mode | `timestamp`                      | `counter`               |
/// |------|----------------------------------|-------------------------|
/// | LRU  | 24-bit LRU clock tick            | unused                  |
/// | LFU  | 16-bit minutes of last decrement | logarithmic access count|
///
/// [`AccessMeta::packed`] folds either layout into the classic 24 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessMeta {
    pub timestamp: u32,
    pub counter: u8,
}

impl AccessMeta {
    /// LRU metadata stamped at `tick`.
    #[inline]
    pub fn lru(tick: u32) -> Self {
        Self {
            timestamp: tick & LRU_CLOCK_MAX,
            counter: 0,
        }
    }

    /// LFU metadata decremented last at `minutes` with `counter` hits.
    #[inline]
    pub fn lfu(minutes: u16, counter: u8) -> Self {
        Self {
            timestamp: minutes as u32,
            counter,
        }
    }

    /// Minutes of last decrement, for LFU-mode metadata.
    #[inline]
    pub fn ldt(&self) -> u16 {
        (self.timestamp & 0xFFFF) as u16
    }

    /// The 24-bit packed form.
    pub fn packed(&self, lfu: bool) -> u32 {
        if lfu {
            ((self.ldt() as u32) << 8) | self.counter as u32
        } else {
            self.timestamp & LRU_CLOCK_MAX
        }
    }

    /// Inverse of [`AccessMeta::packed`].
    pub fn from_packed(bits: u32, lfu: bool) -> Self {
        let bits = bits & LRU_CLOCK_MAX;
        if lfu {
            Self::lfu((bits >> 8) as u16, (bits & 0xFF) as u8)
        } else {
            Self::lru(bits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lfu_packing_layout() {
        let meta = AccessMeta::lfu(0xABCD, 0x42);
        assert_eq!(meta.packed(true), 0x00AB_CD42);
        assert_eq!(AccessMeta::from_packed(0x00AB_CD42, true), meta);
    }

    #[test]
    fn test_lru_tick_is_masked() {
        let meta = AccessMeta::lru(LRU_CLOCK_MAX + 5);
        assert_eq!(meta.timestamp, 4);
        assert_eq!(meta.packed(false), 4);
    }
}
