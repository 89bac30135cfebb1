//! Eviction candidate pool.
//!
//! - [`EvictionPool`] - bounded, score-sorted best-of-N candidates
//! - [`EvictionCandidate`] - one pool slot with a reusable key buffer
//! - [`Scorer`] - policy-specific score of a sampled key

mod candidate;
mod eviction_pool;
mod scorer;

pub use candidate::EvictionCandidate;
pub use eviction_pool::EvictionPool;
pub use scorer::Scorer;
