//! A key set with O(1) insert, remove and uniform random pick.

use std::collections::HashMap;

use rand::seq::index;
use rand::{Rng, RngCore};

/// Keys stored densely in a `Vec` plus a position map.
///
/// Removal swaps the last key into the hole, so picking a random index is
/// always a uniform pick over live keys.
#[derive(Debug, Default)]
pub struct RandomIndex {
    keys: Vec<String>,
    positions: HashMap<String, usize>,
}

impl RandomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key`. Returns `false` if it was already present.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.positions.contains_key(key) {
            return false;
        }
        self.positions.insert(key.to_string(), self.keys.len());
        self.keys.push(key.to_string());
        true
    }

    /// Remove `key`. Returns `false` if it wasn't present.
    pub fn remove(&mut self, key: &str) -> bool {
        let Some(pos) = self.positions.remove(key) else {
            return false;
        };

        self.keys.swap_remove(pos);
        if let Some(moved) = self.keys.get(pos) {
            self.positions.insert(moved.clone(), pos);
        }
        true
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// One key picked uniformly at random.
    pub fn choose(&self, rng: &mut dyn RngCore) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let i = rng.gen_range(0..self.keys.len());
        Some(&self.keys[i])
    }

    /// Up to `count` distinct keys picked uniformly at random.
    pub fn sample(&self, count: usize, rng: &mut dyn RngCore) -> Vec<&str> {
        let amount = count.min(self.keys.len());
        index::sample(rng, self.keys.len(), amount)
            .into_iter()
            .map(|i| self.keys[i].as_str())
            .collect()
    }
}
