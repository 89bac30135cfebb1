//! Allocator usage accounting.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide count of bytes held by the dataset.
///
/// Plays the role of the allocator's used-memory report: the store charges
/// it on insert and credits it when a value is actually freed, which for
/// lazy deletes happens on a background worker.
///
/// # Example
/// ```
/// use maxmem::MemoryTracker;
///
/// let mem = MemoryTracker::new();
/// mem.alloc(128);
/// mem.free(28);
/// assert_eq!(mem.used(), 100);
/// ```
#[derive(Debug, Default)]
pub struct MemoryTracker {
    used: AtomicUsize,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self {
            used: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn alloc(&self, bytes: usize) {
        self.used.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Credit `bytes` back. Saturates at zero.
    #[inline]
    pub fn free(&self, bytes: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                Some(used.saturating_sub(bytes))
            });
    }

    /// Bytes currently in use.
    #[inline]
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    /// Overwrite the counter. For hosts that sample a real allocator.
    pub fn set(&self, bytes: usize) {
        self.used.store(bytes, Ordering::Relaxed);
    }
}
