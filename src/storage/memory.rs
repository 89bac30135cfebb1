//! In-memory keyspace with allocator accounting.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::trace;

use crate::background::{BackgroundWorkers, JobKind};
use crate::common::config::LAZYFREE_THRESHOLD;
use crate::common::DbId;
use crate::estimator::{AccessMeta, Estimator};
use crate::storage::random_index::RandomIndex;
use crate::storage::{DeleteMode, KeySource, Keyspace, MemoryTracker, Sample};

/// Bytes charged per entry on top of its key and value.
pub const ENTRY_OVERHEAD: usize = 32;

struct StoredValue {
    value: Vec<u8>,
    meta: AccessMeta,
    expire_at_ms: Option<u64>,
}

#[derive(Default)]
struct Database {
    entries: HashMap<String, StoredValue>,
    /// Every key, for uniform sampling.
    all: RandomIndex,
    /// Keys with an expiration.
    volatile: RandomIndex,
}

impl Database {
    fn index(&self, source: KeySource) -> &RandomIndex {
        match source {
            KeySource::AllKeys => &self.all,
            KeySource::Volatile => &self.volatile,
        }
    }
}

/// A multi-database keyspace kept entirely in memory.
///
/// Every entry is charged to a shared [`MemoryTracker`] as
/// `key + value + ENTRY_OVERHEAD` bytes. Reads and writes stamp the entry's
/// [`AccessMeta`] through an [`Estimator`].
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │                       MemoryStore                        │
/// │  dbs: Vec<Database>                                      │
/// │   ┌──────────────────────────────────────────────────┐   │
/// │   │ entries: key → (value, AccessMeta, expire_at)    │   │
/// │   │ all:      RandomIndex  (O(1) random key)         │   │
/// │   │ volatile: RandomIndex  (keys with expiration)    │   │
/// │   └──────────────────────────────────────────────────┘   │
/// │  memory: Arc<MemoryTracker>   lazy_free: workers         │
/// └──────────────────────────────────────────────────────────┘
/// ```
///
/// # Lazy deletes
/// With [`MemoryStore::with_lazy_free`], [`DeleteMode::Lazy`] unlinks the key
/// immediately and frees values larger than `LAZYFREE_THRESHOLD` on the
/// lazy-free worker. Their bytes stay charged until the job runs.
pub struct MemoryStore {
    dbs: Vec<Database>,
    memory: Arc<MemoryTracker>,
    estimator: Estimator,
    rng: StdRng,
    lazy_free: Option<Arc<BackgroundWorkers>>,
}

impl MemoryStore {
    /// Create a store with `db_count` empty databases.
    ///
    /// # Panics
    /// Panics if `db_count` is 0.
    pub fn new(db_count: usize, memory: Arc<MemoryTracker>, estimator: Estimator) -> Self {
        assert!(db_count > 0, "db_count must be > 0");

        Self {
            dbs: (0..db_count).map(|_| Database::default()).collect(),
            memory,
            estimator,
            rng: StdRng::from_entropy(),
            lazy_free: None,
        }
    }

    /// Free large values on `workers` for [`DeleteMode::Lazy`] deletes.
    ///
    /// Hand the same workers to the evictor (see [`MemoryStore::lazy_free`])
    /// so it can wait for the backlog these deletes leave behind.
    pub fn with_lazy_free(mut self, workers: Arc<BackgroundWorkers>) -> Self {
        self.lazy_free = Some(workers);
        self
    }

    /// The workers lazily deleted values are freed on, if any.
    pub fn lazy_free(&self) -> Option<&Arc<BackgroundWorkers>> {
        self.lazy_free.as_ref()
    }

    /// Make LFU increments reproducible.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ========================================================================
    // Public API: Writes
    // ========================================================================

    /// Insert or overwrite `key`. An existing expiration is cleared.
    ///
    /// Returns `false` if `db` doesn't exist.
    pub fn set(&mut self, db: DbId, key: &str, value: impl Into<Vec<u8>>) -> bool {
        self.insert(db, key, value.into(), None)
    }

    /// Insert or overwrite `key` with an absolute expiration.
    pub fn set_with_expire(
        &mut self,
        db: DbId,
        key: &str,
        value: impl Into<Vec<u8>>,
        expire_at_ms: u64,
    ) -> bool {
        self.insert(db, key, value.into(), Some(expire_at_ms))
    }

    /// Set the expiration of an existing key.
    pub fn expire(&mut self, db: DbId, key: &str, expire_at_ms: u64) -> bool {
        let Some(d) = self.dbs.get_mut(db.0) else {
            return false;
        };
        match d.entries.get_mut(key) {
            Some(entry) => {
                entry.expire_at_ms = Some(expire_at_ms);
                d.volatile.insert(key);
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, db: DbId, key: &str, value: Vec<u8>, expire_at_ms: Option<u64>) -> bool {
        let Some(existing) = self.dbs.get(db.0) else {
            return false;
        };
        if existing.entries.contains_key(key) {
            self.delete(db, key, DeleteMode::Sync);
        }

        self.memory.alloc(key.len() + value.len() + ENTRY_OVERHEAD);

        let meta = self.estimator.new_meta();
        let d = &mut self.dbs[db.0];
        d.entries.insert(
            key.to_string(),
            StoredValue {
                value,
                meta,
                expire_at_ms,
            },
        );
        d.all.insert(key);
        if expire_at_ms.is_some() {
            d.volatile.insert(key);
        }
        true
    }

    // ========================================================================
    // Public API: Reads
    // ========================================================================

    /// Read `key`, recording the access.
    pub fn get(&mut self, db: DbId, key: &str) -> Option<&[u8]> {
        let entry = self.dbs.get_mut(db.0)?.entries.get_mut(key)?;
        self.estimator.touch(&mut entry.meta, &mut self.rng);
        Some(&entry.value)
    }

    /// Access metadata of `key`, without recording an access.
    pub fn meta(&self, db: DbId, key: &str) -> Option<AccessMeta> {
        self.dbs.get(db.0)?.entries.get(key).map(|e| e.meta)
    }

    /// Overwrite the access metadata of `key`, e.g. when restoring a dump.
    pub fn set_meta(&mut self, db: DbId, key: &str, meta: AccessMeta) -> bool {
        match self.dbs.get_mut(db.0).and_then(|d| d.entries.get_mut(key)) {
            Some(entry) => {
                entry.meta = meta;
                true
            }
            None => false,
        }
    }

    /// Number of keys in `db`.
    pub fn len(&self, db: DbId) -> usize {
        self.dbs.get(db.0).map_or(0, |d| d.entries.len())
    }

    /// Number of keys across all databases.
    pub fn total_keys(&self) -> usize {
        self.dbs.iter().map(|d| d.entries.len()).sum()
    }

    pub fn memory(&self) -> &Arc<MemoryTracker> {
        &self.memory
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }
}

impl Keyspace for MemoryStore {
    fn db_count(&self) -> usize {
        self.dbs.len()
    }

    fn size(&self, db: DbId, source: KeySource) -> usize {
        self.dbs.get(db.0).map_or(0, |d| d.index(source).len())
    }

    fn sample(
        &self,
        db: DbId,
        source: KeySource,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Sample> {
        let Some(d) = self.dbs.get(db.0) else {
            return Vec::new();
        };

        d.index(source)
            .sample(count, rng)
            .into_iter()
            .filter_map(|key| {
                d.entries.get(key).map(|entry| Sample {
                    key: key.to_string(),
                    meta: entry.meta,
                    expire_at_ms: entry.expire_at_ms,
                })
            })
            .collect()
    }

    fn random_key(&self, db: DbId, source: KeySource, rng: &mut dyn RngCore) -> Option<String> {
        self.dbs
            .get(db.0)?
            .index(source)
            .choose(rng)
            .map(str::to_string)
    }

    fn contains(&self, db: DbId, source: KeySource, key: &str) -> bool {
        self.dbs
            .get(db.0)
            .is_some_and(|d| d.index(source).contains(key))
    }

    fn delete(&mut self, db: DbId, key: &str, mode: DeleteMode) -> bool {
        let Some(d) = self.dbs.get_mut(db.0) else {
            return false;
        };
        let Some(entry) = d.entries.remove(key) else {
            return false;
        };
        d.all.remove(key);
        d.volatile.remove(key);

        self.memory.free(key.len() + ENTRY_OVERHEAD);

        let value = entry.value;
        match (&self.lazy_free, mode) {
            (Some(workers), DeleteMode::Lazy) if value.len() > LAZYFREE_THRESHOLD => {
                trace!(%db, key, bytes = value.len(), "deferring value free");
                let memory = Arc::clone(&self.memory);
                workers.submit(
                    JobKind::LazyFree,
                    Box::new(move || {
                        let bytes = value.len();
                        drop(value);
                        memory.free(bytes);
                    }),
                );
            }
            _ => self.memory.free(value.len()),
        }
        true
    }
}
