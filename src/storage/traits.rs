//! The storage contract the evictor consumes.

use rand::RngCore;

use crate::common::DbId;
use crate::estimator::AccessMeta;

/// Which keys of a database a policy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySource {
    /// Every key.
    AllKeys,
    /// Only keys with an expiration set.
    Volatile,
}

/// How a deleted value is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Free everything inline.
    Sync,
    /// Unlink now, hand large values to the lazy-free worker.
    Lazy,
}

/// One sampled key with the inputs needed to score it.
///
/// `meta` always comes from the main dictionary, also when the key was
/// sampled from the volatile set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub key: String,
    pub meta: AccessMeta,
    /// Absolute expiration in Unix milliseconds, if any.
    pub expire_at_ms: Option<u64>,
}

/// A keyspace made of numbered logical databases.
///
/// The evictor only reads and deletes through this trait; it never changes
/// values in place.
pub trait Keyspace {
    /// Number of logical databases.
    fn db_count(&self) -> usize;

    /// Number of keys in `source` of database `db`.
    fn size(&self, db: DbId, source: KeySource) -> usize;

    /// Up to `count` distinct keys drawn at random from `source`.
    fn sample(
        &self,
        db: DbId,
        source: KeySource,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Sample>;

    /// One key drawn uniformly at random from `source`.
    fn random_key(&self, db: DbId, source: KeySource, rng: &mut dyn RngCore) -> Option<String>;

    /// Whether `key` is still present in `source`.
    fn contains(&self, db: DbId, source: KeySource, key: &str) -> bool;

    /// Delete `key`. Returns `false` if it wasn't there.
    fn delete(&mut self, db: DbId, key: &str, mode: DeleteMode) -> bool;
}
