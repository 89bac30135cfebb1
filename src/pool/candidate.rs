//! EvictionCandidate - one slot of the eviction pool.

use std::mem;

use crate::common::config::EVPOOL_CACHED_KEY_SIZE;
use crate::common::DbId;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotKey {
    Empty,
    /// The key lives in the slot's scratch buffer.
    Cached,
    /// Too long for the scratch buffer.
    Owned(String),
}

/// A slot in the eviction pool.
///
/// Each slot owns a scratch buffer allocated once with room for
/// `EVPOOL_CACHED_KEY_SIZE` bytes. Short keys are copied into it so refilling
/// the pool doesn't allocate; longer keys get their own `String`.
///
/// Emptiness is tracked explicitly, never inferred from the buffer.
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
    score: u64,
    db: DbId,
    key: SlotKey,
    cached: String,
}

impl EvictionCandidate {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            score: 0,
            db: DbId::default(),
            key: SlotKey::Empty,
            cached: String::with_capacity(EVPOOL_CACHED_KEY_SIZE),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.key == SlotKey::Empty
    }

    /// Larger means a better eviction candidate.
    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[inline]
    pub fn db(&self) -> DbId {
        self.db
    }

    /// The candidate key, or `None` for an empty slot.
    pub fn key(&self) -> Option<&str> {
        match &self.key {
            SlotKey::Empty => None,
            SlotKey::Cached => Some(&self.cached),
            SlotKey::Owned(key) => Some(key),
        }
    }

    /// Whether the key is held in the reusable scratch buffer.
    #[inline]
    pub fn uses_scratch(&self) -> bool {
        self.key == SlotKey::Cached
    }

    pub(crate) fn fill(&mut self, score: u64, db: DbId, key: &str) {
        if key.len() <= EVPOOL_CACHED_KEY_SIZE {
            self.cached.clear();
            self.cached.push_str(key);
            self.key = SlotKey::Cached;
        } else {
            self.key = SlotKey::Owned(key.to_string());
        }
        self.score = score;
        self.db = db;
    }

    /// Empty the slot, returning its key.
    pub(crate) fn take_key(&mut self) -> Option<String> {
        self.score = 0;
        match mem::replace(&mut self.key, SlotKey::Empty) {
            SlotKey::Empty => None,
            SlotKey::Cached => Some(self.cached.clone()),
            SlotKey::Owned(key) => Some(key),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.score = 0;
        self.key = SlotKey::Empty;
    }
}

impl Default for EvictionCandidate {
    fn default() -> Self {
        Self::new()
    }
}
