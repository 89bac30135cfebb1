//! Evictor - keeps the dataset under `maxmemory`.
//!
//! The [`Evictor`] provides:
//! - Memory budget computation net of replica/AOF buffers
//! - Policy dispatch (pool-based LRU/LFU/TTL, random, noeviction)
//! - The evict loop with freed-bytes accounting
//! - A bounded wait for lazy-free progress when nothing is left to evict

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

use crate::background::{BackgroundWorkers, JobKind};
use crate::common::config::{
    LAZYFREE_MAX_STALLED_STEPS, LAZYFREE_WAIT_STEP_MS, LAZY_EVICTION_CHECK_INTERVAL,
};
use crate::common::{DbId, Error, EvictionConfig, EvictionPolicy, Result};
use crate::estimator::LruClock;
use crate::evict::latency::{EVENT_EVICTION_CYCLE, EVENT_EVICTION_DEL};
use crate::evict::notify::EVENT_EVICTED;
use crate::evict::{
    EvictionStats, HostFlags, KeyspaceNotifier, LatencyMonitor, MemoryBudget, NoOverhead,
    NullNotifier, OverheadSource,
};
use crate::pool::{EvictionPool, Scorer};
use crate::storage::{DeleteMode, Keyspace, MemoryTracker};

/// Outcome of a successful [`Evictor::free_memory_if_needed`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionReport {
    /// The budget seen on entry.
    pub budget: MemoryBudget,
    /// Keys deleted by this call.
    pub keys_evicted: u64,
    /// Bytes released by those deletes, as seen by the allocator.
    pub bytes_freed: usize,
    /// The host state suspended eviction for this call.
    pub skipped: bool,
}

impl EvictionReport {
    fn untouched(budget: MemoryBudget, skipped: bool) -> Self {
        Self {
            budget,
            keys_evicted: 0,
            bytes_freed: 0,
            skipped,
        }
    }
}

/// Frees memory by evicting keys whenever usage exceeds the ceiling.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                          Evictor                            │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
/// │  │ MemoryTracker│  │OverheadSource│  │   EvictionPool   │   │
/// │  │  used bytes  │  │ replica/AOF  │  │ 16 sorted slots  │   │
/// │  └──────────────┘  └──────────────┘  └──────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
/// │  │   LruClock   │  │   notifier   │  │ lazy-free queue  │   │
/// │  │ ticks/minutes│  │  "evicted"   │  │ BackgroundWorkers│   │
/// │  └──────────────┘  └──────────────┘  └──────────────────┘   │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Threading
/// The evictor runs on the command path and takes `&mut self`: the pool,
/// RNG and database cursor are never shared. Only the clock, the memory
/// tracker and the worker queue are touched by other threads.
///
/// # Usage
/// ```
/// use std::sync::Arc;
/// use maxmem::estimator::{Estimator, LruClock, SystemTimeSource};
/// use maxmem::{DbId, EvictionConfig, EvictionPolicy, Evictor, MemoryStore, MemoryTracker};
///
/// let config = EvictionConfig {
///     policy: EvictionPolicy::AllKeysLru,
///     maxmemory: 4096,
///     ..EvictionConfig::default()
/// };
/// let clock = Arc::new(LruClock::from_config(&config, Arc::new(SystemTimeSource)));
/// let memory = Arc::new(MemoryTracker::new());
/// let mut store = MemoryStore::new(1, memory.clone(), Estimator::from_config(&config, clock.clone()));
/// let mut evictor = Evictor::new(config, clock, memory).unwrap();
///
/// for i in 0..100 {
///     store.set(DbId::new(0), &format!("key:{}", i), vec![0u8; 64]);
///     evictor.free_memory_if_needed(&mut store).unwrap();
/// }
/// assert!(evictor.memory_budget().is_satisfied());
/// ```
pub struct Evictor {
    config: EvictionConfig,

    /// Best candidates retained across cycles.
    pool: EvictionPool,

    clock: Arc<LruClock>,

    /// Allocator usage report.
    memory: Arc<MemoryTracker>,

    overhead: Arc<dyn OverheadSource>,

    flags: Arc<HostFlags>,

    notifier: Arc<dyn KeyspaceNotifier>,

    /// Where lazily deleted values are freed, if lazy deletes are in use.
    lazy_free: Option<Arc<BackgroundWorkers>>,

    stats: EvictionStats,

    latency: LatencyMonitor,

    rng: StdRng,

    /// Next database the random policies look at.
    next_db: usize,
}

impl Evictor {
    /// Create an evictor with no overhead, no notifications and no lazy-free
    /// worker. Use the `with_*` methods to attach them.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if `config` fails validation
    pub fn new(config: EvictionConfig, clock: Arc<LruClock>, memory: Arc<MemoryTracker>) -> Result<Self> {
        config.validate()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let latency = LatencyMonitor::new(config.latency_monitor_threshold_ms);

        Ok(Self {
            config,
            pool: EvictionPool::new(),
            clock,
            memory,
            overhead: Arc::new(NoOverhead),
            flags: Arc::new(HostFlags::new()),
            notifier: Arc::new(NullNotifier),
            lazy_free: None,
            stats: EvictionStats::new(),
            latency,
            rng,
            next_db: 0,
        })
    }

    pub fn with_overhead(mut self, overhead: Arc<dyn OverheadSource>) -> Self {
        self.overhead = overhead;
        self
    }

    pub fn with_flags(mut self, flags: Arc<HostFlags>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn KeyspaceNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Wait on `workers` for lazy-free progress before giving up.
    ///
    /// Pass the same workers the keyspace defers its frees to (for a
    /// [`MemoryStore`](crate::storage::MemoryStore), the handle returned by
    /// `lazy_free()`). Without them the evictor can't see the backlog and
    /// reports exhaustion while frees are still queued.
    pub fn with_lazy_free(mut self, workers: Arc<BackgroundWorkers>) -> Self {
        self.lazy_free = Some(workers);
        self
    }

    /// Use a pool with `capacity` slots instead of the default 16.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool = EvictionPool::with_capacity(capacity);
        self
    }

    // ========================================================================
    // Public API: Configuration and stats
    // ========================================================================

    pub fn config(&self) -> &EvictionConfig {
        &self.config
    }

    /// Change the ceiling. Takes effect on the next check.
    pub fn set_maxmemory(&mut self, bytes: usize) {
        self.config.maxmemory = bytes;
    }

    /// Switch policy. Pooled candidates were scored for the old policy and
    /// are dropped. The store's estimator must be switched by the host.
    pub fn set_policy(&mut self, policy: EvictionPolicy) {
        if policy != self.config.policy {
            self.config.policy = policy;
            self.pool.clear();
        }
    }

    pub fn stats(&self) -> &EvictionStats {
        &self.stats
    }

    pub fn latency(&self) -> &LatencyMonitor {
        &self.latency
    }

    pub fn pool(&self) -> &EvictionPool {
        &self.pool
    }

    /// Current memory state against the configured ceiling.
    pub fn memory_budget(&self) -> MemoryBudget {
        MemoryBudget::compute(
            self.memory.used(),
            self.overhead.not_counted_bytes(),
            self.config.maxmemory,
        )
    }

    // ========================================================================
    // Public API: Eviction
    // ========================================================================

    /// Like [`Evictor::free_memory_if_needed`], but does nothing while the
    /// host is loading data or stuck in a timed-out script.
    pub fn free_memory_if_needed_and_safe<K>(&mut self, keyspace: &mut K) -> Result<EvictionReport>
    where
        K: Keyspace + ?Sized,
    {
        if self.flags.eviction_unsafe() {
            return Ok(EvictionReport::untouched(self.memory_budget(), true));
        }
        self.free_memory_if_needed(keyspace)
    }

    /// Evict keys until logical memory usage is back under `maxmemory`.
    ///
    /// Call before admitting any command that may grow memory, and reject
    /// the command on `Err`.
    ///
    /// # Errors
    /// - `Error::EvictionForbidden` if over the ceiling under `noeviction`
    /// - `Error::EvictionExhausted` if no evictable key is left and pending
    ///   lazy frees didn't close the gap
    pub fn free_memory_if_needed<K>(&mut self, keyspace: &mut K) -> Result<EvictionReport>
    where
        K: Keyspace + ?Sized,
    {
        if self.flags.is_replica() && self.config.replica_ignore_maxmemory {
            return Ok(EvictionReport::untouched(self.memory_budget(), true));
        }
        // A paused dataset must not change, not even by eviction.
        if self.flags.clients_paused() {
            return Ok(EvictionReport::untouched(self.memory_budget(), true));
        }

        let budget = self.memory_budget();
        if budget.is_satisfied() {
            return Ok(EvictionReport::untouched(budget, false));
        }

        let policy = self.config.policy;
        if policy == EvictionPolicy::NoEviction {
            self.stats.rejected_cycles.fetch_add(1, Ordering::Relaxed);
            warn!(
                to_free = budget.to_free,
                ratio = budget.usage_ratio,
                "over maxmemory and eviction is disabled"
            );
            return Err(Error::EvictionForbidden {
                to_free: budget.to_free,
                ratio: budget.usage_ratio,
            });
        }

        let mode = if self.config.lazyfree_lazy_eviction {
            DeleteMode::Lazy
        } else {
            DeleteMode::Sync
        };

        let cycle_start = Instant::now();
        let mut freed = 0usize;
        let mut keys_evicted = 0u64;
        let mut exhausted = false;

        while freed < budget.to_free {
            let victim = if policy.uses_pool() {
                self.next_pool_victim(keyspace)
            } else {
                self.next_random_victim(keyspace)
            };

            let Some((db, key)) = victim else {
                exhausted = true;
                break;
            };

            freed = freed.saturating_add(self.evict_key(keyspace, db, &key, mode));
            keys_evicted += 1;

            if self.overhead.replica_count() > 0 {
                self.overhead.flush_replica_output();
            }

            // Lazy deletes barely move the allocator counter on the spot, so
            // check now and then whether the workers already caught up.
            if mode == DeleteMode::Lazy
                && keys_evicted % LAZY_EVICTION_CHECK_INTERVAL == 0
                && self.memory_budget().is_satisfied()
            {
                break;
            }
        }

        self.latency
            .add_sample_if_needed(EVENT_EVICTION_CYCLE, cycle_start.elapsed());

        let converged = !exhausted || self.wait_for_lazy_free();
        self.stats.record_cycle(freed, converged);

        if !converged {
            let now = self.memory_budget();
            warn!(
                %policy,
                keys_evicted,
                owed = now.to_free,
                "no evictable keys left, still over maxmemory"
            );
            return Err(Error::EvictionExhausted {
                owed: now.to_free,
                ratio: now.usage_ratio,
            });
        }

        debug!(%policy, keys_evicted, freed, to_free = budget.to_free, "eviction cycle done");
        Ok(EvictionReport {
            budget,
            keys_evicted,
            bytes_freed: freed,
            skipped: false,
        })
    }

    // ========================================================================
    // Internal: Victim selection
    // ========================================================================

    /// Best pooled candidate, refilling the pool from every database.
    fn next_pool_victim<K>(&mut self, keyspace: &K) -> Option<(DbId, String)>
    where
        K: Keyspace + ?Sized,
    {
        let policy = self.config.policy;
        let source = policy.source();

        loop {
            let scorer = Scorer::for_policy(policy, &self.clock, self.config.lfu_decay_time)?;

            // Sample every database so the choice is global, not per-db.
            let mut total_keys = 0;
            for i in 0..keyspace.db_count() {
                let db = DbId::new(i);
                let keys = keyspace.size(db, source);
                if keys == 0 {
                    continue;
                }
                let samples =
                    keyspace.sample(db, source, self.config.maxmemory_samples, &mut self.rng);
                self.pool.populate(db, samples, &scorer);
                total_keys += keys;
            }

            if total_keys == 0 {
                return None;
            }

            if let Some(victim) = self.pool.consume_best(keyspace, source) {
                return Some(victim);
            }
            trace!("eviction pool had only ghosts, resampling");
        }
    }

    /// A random key from the next non-empty database, round robin.
    fn next_random_victim<K>(&mut self, keyspace: &K) -> Option<(DbId, String)>
    where
        K: Keyspace + ?Sized,
    {
        let source = self.config.policy.source();
        let dbs = keyspace.db_count();

        for _ in 0..dbs {
            let db = DbId::new(self.next_db % dbs);
            self.next_db = db.0 + 1;

            if keyspace.size(db, source) == 0 {
                continue;
            }
            if let Some(key) = keyspace.random_key(db, source, &mut self.rng) {
                return Some((db, key));
            }
        }
        None
    }

    // ========================================================================
    // Internal: Deletion and reclamation
    // ========================================================================

    /// Delete one victim. Returns the allocator delta across the delete.
    fn evict_key<K>(&mut self, keyspace: &mut K, db: DbId, key: &str, mode: DeleteMode) -> usize
    where
        K: Keyspace + ?Sized,
    {
        self.notifier
            .propagate_delete(db, key, mode == DeleteMode::Lazy);

        let before = self.memory.used();
        let started = Instant::now();
        keyspace.delete(db, key, mode);
        self.latency
            .add_sample_if_needed(EVENT_EVICTION_DEL, started.elapsed());
        let freed = before.saturating_sub(self.memory.used());

        self.stats.evicted_keys.fetch_add(1, Ordering::Relaxed);
        self.notifier.publish(EVENT_EVICTED, key, db);
        debug!(%db, key, freed, "evicted key");

        freed
    }

    /// Nothing is left to evict. If lazy frees are still queued, wait for
    /// them one bounded step at a time and recheck the budget after each.
    ///
    /// Gives up once `LAZYFREE_MAX_STALLED_STEPS` steps pass without the
    /// backlog shrinking.
    fn wait_for_lazy_free(&self) -> bool {
        if let Some(workers) = &self.lazy_free {
            let step = Duration::from_millis(LAZYFREE_WAIT_STEP_MS);
            let mut last = workers.pending(JobKind::LazyFree);
            let mut stalled = 0u32;
            loop {
                if self.memory_budget().is_satisfied() {
                    return true;
                }
                if last == 0 {
                    break;
                }
                if stalled >= LAZYFREE_MAX_STALLED_STEPS {
                    warn!(pending = last, "lazy free backlog stalled, giving up");
                    break;
                }

                let left = workers.wait_step(JobKind::LazyFree, step);
                trace!(pending = left, "waiting for lazy free");
                if left < last {
                    stalled = 0;
                } else {
                    stalled += 1;
                }
                last = left;
            }
        }
        self.memory_budget().is_satisfied()
    }
}

impl std::fmt::Debug for Evictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evictor")
            .field("config", &self.config)
            .field("pool", &self.pool.scores())
            .field("stats", &self.stats.snapshot())
            .field("next_db", &self.next_db)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{AccessMeta, Estimator, ManualTimeSource};
    use crate::evict::RecordingNotifier;
    use crate::storage::{KeySource, MemoryStore, Sample, ENTRY_OVERHEAD};
    use rand::RngCore;
    use std::cell::Cell;

    /// Helper to create a store and evictor sharing a clock and tracker.
    fn create_test_evictor(policy: EvictionPolicy, maxmemory: usize) -> (Evictor, MemoryStore) {
        let config = EvictionConfig {
            policy,
            maxmemory,
            rng_seed: Some(11),
            ..EvictionConfig::default()
        };
        let time = Arc::new(ManualTimeSource::new(10_000_000));
        let clock = Arc::new(LruClock::from_config(&config, time));
        let memory = Arc::new(MemoryTracker::new());
        let store = MemoryStore::new(
            2,
            Arc::clone(&memory),
            Estimator::from_config(&config, Arc::clone(&clock)),
        )
        .with_rng_seed(5);
        let evictor = Evictor::new(config, clock, memory).unwrap();
        (evictor, store)
    }

    #[test]
    fn test_satisfied_does_nothing() {
        let (mut evictor, mut store) = create_test_evictor(EvictionPolicy::AllKeysLru, 0);
        store.set(DbId::new(0), "k", vec![0u8; 1000]);

        let report = evictor.free_memory_if_needed(&mut store).unwrap();
        assert_eq!(report.keys_evicted, 0);
        assert!(!report.skipped);
        assert_eq!(store.total_keys(), 1);
        assert_eq!(evictor.stats().snapshot().eviction_cycles, 0);
    }

    #[test]
    fn test_ghost_in_pool_is_skipped() {
        let (mut evictor, mut store) = create_test_evictor(EvictionPolicy::AllKeysLru, 100);
        let notifier = Arc::new(RecordingNotifier::new());
        evictor = evictor.with_notifier(notifier.clone());

        // The only pooled candidate refers to a key deleted elsewhere
        evictor.pool.insert(u64::MAX, DbId::new(0), "gone");

        for i in 0..4 {
            store.set(DbId::new(0), &format!("k{}", i), vec![0u8; 40]);
        }

        let report = evictor.free_memory_if_needed(&mut store).unwrap();
        assert!(report.keys_evicted >= 1);
        assert!(evictor.memory_budget().is_satisfied());
        assert!(notifier.events().iter().all(|e| e.key != "gone"));
    }

    #[test]
    fn test_lru_evicts_oldest_when_sampling_everything() {
        let (mut evictor, mut store) = create_test_evictor(EvictionPolicy::AllKeysLru, 0);
        let db = DbId::new(0);
        let now = evictor.clock.now();
        for i in 0..5u32 {
            let key = format!("k{}", i);
            store.set(db, &key, "v");
            // k0 is the most idle
            store.set_meta(db, &key, AccessMeta::lru(now - 100 + i * 10));
        }

        let entry = 2 + 1 + ENTRY_OVERHEAD;
        evictor.set_maxmemory(entry * 4);
        evictor.free_memory_if_needed(&mut store).unwrap();

        assert_eq!(store.len(db), 4);
        assert!(store.meta(db, "k0").is_none());
    }

    #[test]
    fn test_random_policy_round_robins_databases() {
        let (mut evictor, mut store) = create_test_evictor(EvictionPolicy::AllKeysRandom, 0);
        for db in 0..2 {
            for i in 0..3 {
                store.set(DbId::new(db), &format!("k{}", i), "v");
            }
        }
        let entry = 2 + 1 + ENTRY_OVERHEAD;

        evictor.set_maxmemory(entry * 5);
        evictor.free_memory_if_needed(&mut store).unwrap();
        assert_eq!(store.len(DbId::new(0)), 2);

        evictor.set_maxmemory(entry * 4);
        evictor.free_memory_if_needed(&mut store).unwrap();
        assert_eq!(store.len(DbId::new(1)), 2);
    }

    #[test]
    fn test_set_policy_clears_pool() {
        let (mut evictor, _store) = create_test_evictor(EvictionPolicy::AllKeysLru, 0);
        evictor.pool.insert(5, DbId::new(0), "k");
        evictor.set_policy(EvictionPolicy::AllKeysLfu);
        assert!(evictor.pool().is_empty());
        assert_eq!(evictor.config().policy, EvictionPolicy::AllKeysLfu);
    }

    #[test]
    fn test_pool_of_only_ghosts_is_resampled() {
        let (mut evictor, mut store) = create_test_evictor(EvictionPolicy::AllKeysLru, 0);
        let notifier = Arc::new(RecordingNotifier::new());
        evictor = evictor.with_notifier(notifier.clone());
        let db = DbId::new(0);

        // Every slot holds a deleted key scoring above anything live
        for i in 0..evictor.pool().capacity() {
            evictor.pool.insert(u64::MAX, db, &format!("ghost:{}", i));
        }
        assert_eq!(evictor.pool().len(), evictor.pool().capacity());

        store.set(db, "live", "v");
        evictor.set_maxmemory(1);
        let report = evictor.free_memory_if_needed(&mut store).unwrap();

        assert_eq!(report.keys_evicted, 1);
        assert_eq!(store.total_keys(), 0);
        assert!(evictor.pool().is_empty());
        let evicted: Vec<String> = notifier.events().into_iter().map(|e| e.key).collect();
        assert_eq!(evicted, vec!["live".to_string()]);
    }

    /// A keyspace whose lazy deletes release value bytes only once the
    /// evictor looks at the keyspace again, like a worker catching up
    /// between evictions.
    struct DeferredFreeKeyspace {
        keys: Vec<String>,
        value_len: usize,
        memory: Arc<MemoryTracker>,
        deferred: Cell<usize>,
    }

    impl DeferredFreeKeyspace {
        fn new(keys: usize, value_len: usize, memory: Arc<MemoryTracker>) -> Self {
            memory.alloc(keys * value_len);
            Self {
                keys: (0..keys).map(|i| format!("k{}", i)).collect(),
                value_len,
                memory,
                deferred: Cell::new(0),
            }
        }
    }

    impl Keyspace for DeferredFreeKeyspace {
        fn db_count(&self) -> usize {
            1
        }

        fn size(&self, _db: DbId, _source: KeySource) -> usize {
            self.memory.free(self.deferred.take());
            self.keys.len()
        }

        fn sample(
            &self,
            _db: DbId,
            _source: KeySource,
            count: usize,
            _rng: &mut dyn RngCore,
        ) -> Vec<Sample> {
            self.keys
                .iter()
                .take(count)
                .map(|key| Sample {
                    key: key.clone(),
                    meta: AccessMeta::default(),
                    expire_at_ms: None,
                })
                .collect()
        }

        fn random_key(&self, _db: DbId, _source: KeySource, _rng: &mut dyn RngCore) -> Option<String> {
            self.keys.first().cloned()
        }

        fn contains(&self, _db: DbId, _source: KeySource, key: &str) -> bool {
            self.keys.iter().any(|k| k == key)
        }

        fn delete(&mut self, _db: DbId, key: &str, mode: DeleteMode) -> bool {
            let Some(pos) = self.keys.iter().position(|k| k == key) else {
                return false;
            };
            self.keys.remove(pos);
            match mode {
                DeleteMode::Lazy => self.deferred.set(self.deferred.get() + self.value_len),
                DeleteMode::Sync => self.memory.free(self.value_len),
            }
            true
        }
    }

    #[test]
    fn test_lazy_eviction_rechecks_budget_every_interval() {
        let config = EvictionConfig {
            policy: EvictionPolicy::AllKeysLru,
            // 500 bytes over with 40 keys of 100 bytes
            maxmemory: 3_500,
            lazyfree_lazy_eviction: true,
            rng_seed: Some(1),
            ..EvictionConfig::default()
        };
        let time = Arc::new(ManualTimeSource::new(10_000_000));
        let clock = Arc::new(LruClock::from_config(&config, time));
        let memory = Arc::new(MemoryTracker::new());
        let mut keyspace = DeferredFreeKeyspace::new(40, 100, Arc::clone(&memory));
        let mut evictor = Evictor::new(config, clock, memory).unwrap();

        // None of the bytes show up inside a delete, so only the periodic
        // recheck notices the budget was met after the sixth eviction.
        let report = evictor.free_memory_if_needed(&mut keyspace).unwrap();

        assert_eq!(report.bytes_freed, 0);
        assert_eq!(report.keys_evicted, LAZY_EVICTION_CHECK_INTERVAL);
        assert_eq!(keyspace.keys.len(), 40 - LAZY_EVICTION_CHECK_INTERVAL as usize);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EvictionConfig {
            maxmemory_samples: 0,
            ..EvictionConfig::default()
        };
        let time = Arc::new(ManualTimeSource::new(0));
        let clock = Arc::new(LruClock::new(time, 1000, 10));
        let result = Evictor::new(config, clock, Arc::new(MemoryTracker::new()));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
