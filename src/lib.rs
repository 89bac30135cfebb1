//! maxmem - bounded-memory key eviction for an in-memory key/value server.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                             maxmem                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │             Orchestrator (evict/)                       │    │
//! │  │   MemoryBudget → policy dispatch → evict loop → wait    │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │                 ↓                          ↓                    │
//! │  ┌──────────────────────────┐  ┌──────────────────────────┐     │
//! │  │  Candidate pool (pool/)  │  │ Lazy free (background/)  │     │
//! │  │  16 slots, best-of-N     │  │ one worker per job kind  │     │
//! │  └──────────────────────────┘  └──────────────────────────┘     │
//! │                 ↓                                               │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │           Estimator (estimator/)                        │    │
//! │  │     24-bit LRU clock  |  LFU log counter + decay        │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │                 ↓                                               │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │           Keyspace (storage/)                           │    │
//! │  │     Keyspace trait + MemoryStore + MemoryTracker        │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (DbId, Error, config)
//! - [`estimator`] - Per-key recency/frequency metadata
//! - [`pool`] - The eviction candidate pool
//! - [`evict`] - The evictor and its host hooks
//! - [`storage`] - Keyspace contract and an in-memory store
//! - [`background`] - Background job workers
//!
//! # Quick Start
//! ```
//! use std::sync::Arc;
//! use maxmem::estimator::{Estimator, LruClock, SystemTimeSource};
//! use maxmem::{DbId, EvictionConfig, EvictionPolicy, Evictor, MemoryStore, MemoryTracker};
//!
//! let config: EvictionConfig = EvictionConfig {
//!     policy: "allkeys-lfu".parse().unwrap(),
//!     maxmemory: 1024,
//!     ..EvictionConfig::default()
//! };
//! let clock = Arc::new(LruClock::from_config(&config, Arc::new(SystemTimeSource)));
//! let memory = Arc::new(MemoryTracker::new());
//! let mut store = MemoryStore::new(16, memory.clone(), Estimator::from_config(&config, clock.clone()));
//! let mut evictor = Evictor::new(config, clock, memory).unwrap();
//!
//! store.set(DbId::new(0), "greeting", vec![0u8; 2048]);
//! let report = evictor.free_memory_if_needed(&mut store).unwrap();
//! assert_eq!(report.keys_evicted, 1);
//! assert_eq!(evictor.config().policy, EvictionPolicy::AllKeysLfu);
//! ```

// Core modules
pub mod background;
pub mod common;
pub mod estimator;
pub mod evict;
pub mod pool;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::EVPOOL_SIZE;
pub use common::{DbId, Error, EvictionConfig, EvictionPolicy, Result};

pub use estimator::{AccessMeta, Estimator, LruClock};
pub use evict::{EvictionReport, EvictionStats, Evictor, MemoryBudget, StatsSnapshot};
pub use pool::EvictionPool;
pub use storage::{Keyspace, MemoryStore, MemoryTracker};
