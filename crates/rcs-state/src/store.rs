//! StateStore — redb-backed object persistence for RCS.
//!
//! Generic CRUD over every [`Resource`] kind. Each write bumps a global
//! resource version inside the same transaction; `update` rejects a stale
//! version with [`StateError::Conflict`]. Deleting an object that still
//! carries finalizers only stamps `deletionTimestamp`; the record is removed
//! once an update clears the last finalizer. Committed writes are published
//! on a broadcast change stream for informers.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

const WATCH_CAPACITY: usize = 1024;

/// What happened to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Applied,
    Deleted,
}

/// A committed write, published after the transaction commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: Kind,
    pub key: ObjectKey,
    pub change: Change,
}

/// Thread-safe object store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
    events: broadcast::Sender<WatchEvent>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::from_database(db)?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::from_database(db)?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn from_database(db: Database) -> StateResult<Self> {
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        let store = Self {
            db: Arc::new(db),
            events,
        };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        for kind in [
            Kind::Capp,
            Kind::RcsConfig,
            Kind::Placement,
            Kind::PlacementDecision,
            Kind::ManifestWork,
            Kind::ConfigMap,
            Kind::Secret,
            Kind::RoleBinding,
            Kind::Node,
            Kind::Pod,
            Kind::PlacementScore,
            Kind::Event,
        ] {
            txn.open_table(kind.table()).map_err(map_err!(Table))?;
        }
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Subscribe to committed writes.
    pub fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    fn publish(&self, kind: Kind, key: ObjectKey, change: Change) {
        // No subscribers is fine.
        let _ = self.events.send(WatchEvent { kind, key, change });
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Get an object, or `None` if absent.
    pub fn get<T: Resource>(&self, namespace: &str, name: &str) -> StateResult<Option<T>> {
        let key = ObjectKey::new(namespace, name).table_key();
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(T::KIND.table()).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get an object, failing with [`StateError::NotFound`] if absent.
    pub fn fetch<T: Resource>(&self, namespace: &str, name: &str) -> StateResult<T> {
        self.get(namespace, name)?.ok_or_else(|| StateError::NotFound {
            kind: T::KIND.as_str(),
            key: ObjectKey::new(namespace, name).to_string(),
        })
    }

    /// List objects of a kind, optionally restricted to one namespace.
    pub fn list<T: Resource>(&self, namespace: Option<&str>) -> StateResult<Vec<T>> {
        let prefix = namespace.map(|ns| format!("{ns}/"));
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(T::KIND.table()).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if let Some(prefix) = &prefix
                && !key.value().starts_with(prefix.as_str())
            {
                continue;
            }
            results.push(decode(value.value())?);
        }
        Ok(results)
    }

    /// List objects in `namespace` whose labels contain every selector pair.
    pub fn list_labeled<T: Resource>(
        &self,
        namespace: &str,
        selector: &[(&str, &str)],
    ) -> StateResult<Vec<T>> {
        let all: Vec<T> = self.list(Some(namespace))?;
        Ok(all
            .into_iter()
            .filter(|obj| {
                selector.iter().all(|(k, v)| {
                    obj.meta().labels.get(*k).map(String::as_str) == Some(*v)
                })
            })
            .collect())
    }

    // ── Writes ─────────────────────────────────────────────────────

    /// Create a new object. Fails with `AlreadyExists` if the key is taken.
    pub fn create<T: Resource>(&self, obj: &T) -> StateResult<T> {
        let key = obj.key();
        let table_key = key.table_key();
        let mut stored = obj.clone();

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(T::KIND.table()).map_err(map_err!(Table))?;
            if table.get(table_key.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::AlreadyExists {
                    kind: T::KIND.as_str(),
                    key: key.to_string(),
                });
            }
            let meta = stored.meta_mut();
            meta.resource_version = next_version(&txn)?;
            meta.deletion_timestamp = None;
            let value = encode(&stored)?;
            table
                .insert(table_key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;

        debug!(kind = %T::KIND, %key, version = stored.meta().resource_version, "object created");
        self.publish(T::KIND, key, Change::Applied);
        Ok(stored)
    }

    /// Replace an existing object.
    ///
    /// `obj.metadata.resource_version` must match the stored version. A
    /// deletion timestamp already set by the store is carried over; if the
    /// object is deleting and the update clears its last finalizer, the record
    /// is removed.
    pub fn update<T: Resource>(&self, obj: &T) -> StateResult<T> {
        let key = obj.key();
        let table_key = key.table_key();
        let mut stored = obj.clone();
        let removed;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(T::KIND.table()).map_err(map_err!(Table))?;
            let current: T = match table.get(table_key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => decode(guard.value())?,
                None => {
                    return Err(StateError::NotFound {
                        kind: T::KIND.as_str(),
                        key: key.to_string(),
                    });
                }
            };

            let actual = current.meta().resource_version;
            let expected = obj.meta().resource_version;
            if actual != expected {
                return Err(StateError::Conflict {
                    kind: T::KIND.as_str(),
                    key: key.to_string(),
                    expected,
                    actual,
                });
            }

            let meta = stored.meta_mut();
            meta.deletion_timestamp = current.meta().deletion_timestamp;
            meta.resource_version = next_version(&txn)?;
            removed = meta.is_deleting() && meta.finalizers.is_empty();

            if removed {
                table.remove(table_key.as_str()).map_err(map_err!(Write))?;
            } else {
                let value = encode(&stored)?;
                table
                    .insert(table_key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;

        if removed {
            debug!(kind = %T::KIND, %key, "last finalizer cleared, object removed");
            self.publish(T::KIND, key, Change::Deleted);
        } else {
            debug!(kind = %T::KIND, %key, version = stored.meta().resource_version, "object updated");
            self.publish(T::KIND, key, Change::Applied);
        }
        Ok(stored)
    }

    /// Create or overwrite without a version check.
    ///
    /// Used for seeding and administrative writes, never by reconcilers.
    pub fn apply<T: Resource>(&self, obj: &T) -> StateResult<T> {
        let key = obj.key();
        let table_key = key.table_key();
        let mut stored = obj.clone();

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(T::KIND.table()).map_err(map_err!(Table))?;
            let deletion = match table.get(table_key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => decode::<T>(guard.value())?.meta().deletion_timestamp,
                None => None,
            };
            let meta = stored.meta_mut();
            meta.deletion_timestamp = deletion;
            meta.resource_version = next_version(&txn)?;
            let value = encode(&stored)?;
            table
                .insert(table_key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;

        debug!(kind = %T::KIND, %key, "object applied");
        self.publish(T::KIND, key, Change::Applied);
        Ok(stored)
    }

    /// Request deletion of an object.
    ///
    /// With finalizers present the object is only marked deleting and `false`
    /// is returned. Returns `true` when the record was removed.
    pub fn delete<T: Resource>(&self, namespace: &str, name: &str) -> StateResult<bool> {
        let key = ObjectKey::new(namespace, name);
        let table_key = key.table_key();
        let removed;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(T::KIND.table()).map_err(map_err!(Table))?;
            let mut current: T = match table.get(table_key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => decode(guard.value())?,
                None => {
                    return Err(StateError::NotFound {
                        kind: T::KIND.as_str(),
                        key: key.to_string(),
                    });
                }
            };

            removed = current.meta().finalizers.is_empty();
            if removed {
                table.remove(table_key.as_str()).map_err(map_err!(Write))?;
            } else if !current.meta().is_deleting() {
                let meta = current.meta_mut();
                meta.deletion_timestamp = Some(epoch_secs());
                meta.resource_version = next_version(&txn)?;
                let value = encode(&current)?;
                table
                    .insert(table_key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            } else {
                // Already marked; nothing to write.
                return Ok(false);
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;

        if removed {
            debug!(kind = %T::KIND, %key, "object deleted");
            self.publish(T::KIND, key, Change::Deleted);
        } else {
            debug!(kind = %T::KIND, %key, "object marked for deletion");
            self.publish(T::KIND, key, Change::Applied);
        }
        Ok(removed)
    }
}

/// Allocate the next resource version inside `txn`.
fn next_version(txn: &WriteTransaction) -> StateResult<u64> {
    let mut meta = txn.open_table(META).map_err(map_err!(Table))?;
    let current = meta
        .get(RESOURCE_VERSION_KEY)
        .map_err(map_err!(Read))?
        .map(|g| g.value())
        .unwrap_or(0);
    let next = current + 1;
    meta.insert(RESOURCE_VERSION_KEY, next)
        .map_err(map_err!(Write))?;
    Ok(next)
}

fn encode<T: serde::Serialize>(value: &T) -> StateResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(map_err!(Serialize))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StateResult<T> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
