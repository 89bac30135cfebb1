//! The best-of-N eviction pool.
//!
//! Sampling a handful of random keys per cycle is a poor LRU on its own.
//! Keeping the best candidates seen across cycles in a small sorted pool
//! makes the approximation converge toward true LRU/LFU ordering at
//! constant memory.

use tracing::trace;

use crate::common::config::EVPOOL_SIZE;
use crate::common::DbId;
use crate::pool::{EvictionCandidate, Scorer};
use crate::storage::{KeySource, Keyspace, Sample};

/// A fixed number of slots sorted ascending by score.
///
/// # Layout
/// ```text
///   worst ──────────────────────────────────────▶ best
///  ┌──────┬──────┬──────┬──────┬──────┬──────┬──────┐
///  │  12  │  40  │  41  │  90  │ 300  │empty │empty │
///  └──────┴──────┴──────┴──────┴──────┴──────┴──────┘
///    0      1      2      3      4      5      6
/// ```
/// Occupied slots always form a prefix. [`EvictionPool::consume_best`]
/// takes from the right end.
#[derive(Debug, Clone)]
pub struct EvictionPool {
    slots: Vec<EvictionCandidate>,
}

impl EvictionPool {
    /// Create a pool with `EVPOOL_SIZE` slots.
    pub fn new() -> Self {
        Self::with_capacity(EVPOOL_SIZE)
    }

    /// Create a pool with `capacity` slots.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "pool capacity must be > 0");
        Self {
            slots: (0..capacity).map(|_| EvictionCandidate::new()).collect(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].is_empty()
    }

    /// Occupied slots, worst candidate first.
    pub fn candidates(&self) -> impl Iterator<Item = &EvictionCandidate> {
        self.slots.iter().filter(|s| !s.is_empty())
    }

    /// Scores of the occupied slots, worst candidate first.
    pub fn scores(&self) -> Vec<u64> {
        self.candidates().map(|c| c.score()).collect()
    }

    /// Empty every slot. Scratch buffers are kept.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    /// Merge one scored key into the pool.
    ///
    /// Returns `false` if the pool is full and `score` doesn't beat the
    /// worst candidate held; ties go to the candidate already pooled.
    pub fn insert(&mut self, score: u64, db: DbId, key: &str) -> bool {
        let cap = self.slots.len();

        // First slot that is empty or at least as good as the new key.
        let mut k = 0;
        while k < cap && !self.slots[k].is_empty() && self.slots[k].score() < score {
            k += 1;
        }

        if k == 0 && !self.slots[cap - 1].is_empty() {
            return false;
        } else if k < cap && self.slots[k].is_empty() {
            // Inserting into an empty slot, nothing to move.
        } else if self.slots[cap - 1].is_empty() {
            // Room on the right: shift [k, cap) one step right. The empty
            // last slot (and its scratch buffer) rotates into position k.
            self.slots[k..].rotate_right(1);
        } else {
            // Full: drop the worst candidate at slot 0 and shift [1, k)
            // one step left, freeing k - 1.
            k -= 1;
            self.slots[..=k].rotate_left(1);
        }

        self.slots[k].fill(score, db, key);
        true
    }

    /// Score `samples` from database `db` and merge them into the pool.
    ///
    /// Returns how many samples were kept.
    pub fn populate<I>(&mut self, db: DbId, samples: I, scorer: &Scorer) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut kept = 0;
        for sample in samples {
            let score = scorer.score(&sample);
            if self.insert(score, db, &sample.key) {
                kept += 1;
            }
        }
        kept
    }

    /// Take the best candidate that still exists in `source`.
    ///
    /// Walks from the best slot down, emptying every slot it visits. Slots
    /// whose key was deleted since sampling (ghosts) are dropped silently.
    /// Returns `None` if the pool held no live candidate; the caller should
    /// refill it from fresh samples before giving up.
    pub fn consume_best<K>(&mut self, keyspace: &K, source: KeySource) -> Option<(DbId, String)>
    where
        K: Keyspace + ?Sized,
    {
        for slot in self.slots.iter_mut().rev() {
            let Some(key) = slot.key() else {
                continue;
            };

            let db = slot.db();
            if keyspace.contains(db, source, key) {
                return slot.take_key().map(|key| (db, key));
            }

            trace!(%db, key, "dropping ghost pool entry");
            slot.clear();
        }
        None
    }
}

impl Default for EvictionPool {
    fn default() -> Self {
        Self::new()
    }
}
