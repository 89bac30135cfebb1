//! Storage layer - the keyspace the evictor reads from and deletes into.
//!
//! This module handles the dataset side of eviction:
//! - [`Keyspace`] - The contract the evictor consumes
//! - [`MemoryStore`] - An in-memory multi-database keyspace
//! - [`MemoryTracker`] - Allocator usage accounting

mod memory;
mod memory_tracker;
mod random_index;
mod traits;

pub use memory::{MemoryStore, ENTRY_OVERHEAD};
pub use memory_tracker::MemoryTracker;
pub use random_index::RandomIndex;
pub use traits::{DeleteMode, KeySource, Keyspace, Sample};
