//! Memory budget: how far the dataset is over its ceiling.

/// The memory state seen by one eviction check.
///
/// Recomputed on every check; nothing here is cached between cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryBudget {
    /// Allocator-reported usage.
    pub used_bytes: usize,
    /// Replica and AOF buffers, excluded from eviction accounting.
    pub overhead_bytes: usize,
    /// `used_bytes - overhead_bytes`, floored at 0.
    pub logical_used: usize,
    /// `maxmemory`; 0 means unlimited.
    pub ceiling: usize,
    /// Bytes that must be freed to get back under the ceiling.
    pub to_free: usize,
    /// `logical_used / ceiling`, or 0.0 when unlimited.
    pub usage_ratio: f32,
}

impl MemoryBudget {
    pub fn compute(used_bytes: usize, overhead_bytes: usize, ceiling: usize) -> Self {
        let logical_used = used_bytes.saturating_sub(overhead_bytes);

        let (to_free, usage_ratio) = if ceiling == 0 {
            (0, 0.0)
        } else {
            (
                logical_used.saturating_sub(ceiling),
                logical_used as f32 / ceiling as f32,
            )
        };

        Self {
            used_bytes,
            overhead_bytes,
            logical_used,
            ceiling,
            to_free,
            usage_ratio,
        }
    }

    /// Whether the dataset fits: unlimited, or logical usage ≤ ceiling.
    #[inline]
    pub fn is_satisfied(&self) -> bool {
        self.to_free == 0
    }
}
