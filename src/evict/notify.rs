//! Keyspace event hooks fired by eviction.

use parking_lot::Mutex;

use crate::common::DbId;

/// Event published for every evicted key.
pub const EVENT_EVICTED: &str = "evicted";

/// Receives keyspace events produced by the evictor.
pub trait KeyspaceNotifier: Send + Sync {
    /// Publish `event` for `key` in `db`.
    fn publish(&self, event: &'static str, key: &str, db: DbId);

    /// Called before an evicted key is deleted, so the host can forward
    /// the delete to replicas and the append-only file.
    fn propagate_delete(&self, _db: DbId, _key: &str, _lazy: bool) {}
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl KeyspaceNotifier for NullNotifier {
    fn publish(&self, _event: &'static str, _key: &str, _db: DbId) {}
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceEvent {
    pub event: &'static str,
    pub key: String,
    pub db: DbId,
}

/// Keeps every published event and propagated delete in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<KeyspaceEvent>>,
    propagated: Mutex<Vec<(DbId, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<KeyspaceEvent> {
        self.events.lock().clone()
    }

    pub fn propagated(&self) -> Vec<(DbId, String)> {
        self.propagated.lock().clone()
    }
}

impl KeyspaceNotifier for RecordingNotifier {
    fn publish(&self, event: &'static str, key: &str, db: DbId) {
        self.events.lock().push(KeyspaceEvent {
            event,
            key: key.to_string(),
            db,
        });
    }

    fn propagate_delete(&self, db: DbId, key: &str, _lazy: bool) {
        self.propagated.lock().push((db, key.to_string()));
    }
}
