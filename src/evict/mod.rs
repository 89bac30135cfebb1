//! Eviction orchestration.
//!
//! This module decides when to evict and what:
//! - [`Evictor`] - The entry point called before memory-growing commands
//! - [`MemoryBudget`] - Usage against `maxmemory`, net of buffers
//! - [`OverheadSource`] / [`HostFlags`] - What the server tells the evictor
//! - [`KeyspaceNotifier`] - "evicted" events and delete propagation
//! - [`EvictionStats`] / [`LatencyMonitor`] - Counters and slow-event samples

mod budget;
mod evictor;
mod host;
pub mod latency;
pub mod notify;
mod stats;

pub use budget::MemoryBudget;
pub use evictor::{EvictionReport, Evictor};
pub use host::{HostFlags, NoOverhead, OverheadSource, SharedOverhead};
pub use latency::LatencyMonitor;
pub use notify::{KeyspaceEvent, KeyspaceNotifier, NullNotifier, RecordingNotifier};
pub use stats::{EvictionStats, StatsSnapshot};
