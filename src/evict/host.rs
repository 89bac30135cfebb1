//! What the evictor needs to know about the rest of the server.
//!
//! - [`OverheadSource`] - transient buffers excluded from the memory budget
//! - [`HostFlags`] - server states that suspend eviction

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Reports memory that is counted by the allocator but must not drive
/// eviction: replica output buffers and append-only-file buffers.
pub trait OverheadSource: Send + Sync {
    /// Connected replicas.
    fn replica_count(&self) -> usize;

    /// Sum of pending output buffer bytes over all replicas.
    fn replica_output_bytes(&self) -> usize;

    fn aof_enabled(&self) -> bool;

    fn aof_buffer_bytes(&self) -> usize;

    fn aof_rewrite_buffer_bytes(&self) -> usize;

    /// Push pending replica output to the sockets. Called during long
    /// eviction cycles so replica buffers don't grow unbounded.
    fn flush_replica_output(&self) {}

    /// Total bytes to subtract from the allocator report.
    fn not_counted_bytes(&self) -> usize {
        let mut overhead = self.replica_output_bytes();
        if self.aof_enabled() {
            overhead += self.aof_buffer_bytes() + self.aof_rewrite_buffer_bytes();
        }
        overhead
    }
}

/// No replicas, no AOF.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverhead;

impl OverheadSource for NoOverhead {
    fn replica_count(&self) -> usize {
        0
    }
    fn replica_output_bytes(&self) -> usize {
        0
    }
    fn aof_enabled(&self) -> bool {
        false
    }
    fn aof_buffer_bytes(&self) -> usize {
        0
    }
    fn aof_rewrite_buffer_bytes(&self) -> usize {
        0
    }
}

/// Overhead figures the host updates as buffers change.
#[derive(Debug, Default)]
pub struct SharedOverhead {
    pub replicas: AtomicUsize,
    pub replica_output: AtomicUsize,
    pub aof_enabled: AtomicBool,
    pub aof_buffer: AtomicUsize,
    pub aof_rewrite_buffer: AtomicUsize,
}

impl SharedOverhead {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverheadSource for SharedOverhead {
    fn replica_count(&self) -> usize {
        self.replicas.load(Ordering::Relaxed)
    }
    fn replica_output_bytes(&self) -> usize {
        self.replica_output.load(Ordering::Relaxed)
    }
    fn aof_enabled(&self) -> bool {
        self.aof_enabled.load(Ordering::Relaxed)
    }
    fn aof_buffer_bytes(&self) -> usize {
        self.aof_buffer.load(Ordering::Relaxed)
    }
    fn aof_rewrite_buffer_bytes(&self) -> usize {
        self.aof_rewrite_buffer.load(Ordering::Relaxed)
    }
}

/// Server states under which eviction is skipped.
#[derive(Debug, Default)]
pub struct HostFlags {
    /// This node replicates from a primary.
    pub is_replica: AtomicBool,
    /// Client commands are paused; the dataset must stay static.
    pub clients_paused: AtomicBool,
    /// A dataset is being loaded from disk.
    pub loading: AtomicBool,
    /// A script exceeded its time limit and is still running.
    pub script_timed_out: AtomicBool,
}

impl HostFlags {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_replica(&self) -> bool {
        self.is_replica.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn clients_paused(&self) -> bool {
        self.clients_paused.load(Ordering::Relaxed)
    }

    /// Whether evicting now would be unsafe for the host.
    #[inline]
    pub fn eviction_unsafe(&self) -> bool {
        self.loading.load(Ordering::Relaxed) || self.script_timed_out.load(Ordering::Relaxed)
    }
}
