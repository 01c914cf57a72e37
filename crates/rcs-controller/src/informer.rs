//! Informers: a local cache over one kind, fed by the store's change stream.
//!
//! Each change is turned into an `(old, new)` pair from the cache and the
//! fresh store read, passed through the predicate, and mapped to the key of
//! the object the controller reconciles.

use std::collections::HashMap;

use rcs_state::{Change, Kind, ObjectKey, Resource, StateResult, StateStore, WatchEvent};
use tracing::trace;

/// `should_enqueue(old, new)`; `new` is `None` once the object is gone.
pub type Predicate<T> = Box<dyn Fn(Option<&T>, Option<&T>) -> bool + Send + Sync>;

/// Maps a changed object to the reconcile key it affects.
pub type Mapper<T> = Box<dyn Fn(&T) -> Option<ObjectKey> + Send + Sync>;

/// Object-safe view of an informer so a controller can own several kinds.
pub trait Source: Send {
    fn kind(&self) -> Kind;

    /// Apply one change; returns the key to enqueue, if any.
    fn handle(&mut self, event: &WatchEvent) -> StateResult<Option<ObjectKey>>;

    /// Re-read everything and return the keys that pass the predicate.
    fn relist(&mut self) -> StateResult<Vec<ObjectKey>>;
}

pub struct Informer<T: Resource> {
    store: StateStore,
    cache: HashMap<ObjectKey, T>,
    predicate: Predicate<T>,
    mapper: Mapper<T>,
}

impl<T: Resource> Informer<T> {
    /// Informer enqueueing every change under the object's own key.
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            cache: HashMap::new(),
            predicate: Box::new(|_, _| true),
            mapper: Box::new(|obj| Some(obj.key())),
        }
    }

    pub fn with_predicate(
        mut self,
        predicate: impl Fn(Option<&T>, Option<&T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    pub fn with_mapper(
        mut self,
        mapper: impl Fn(&T) -> Option<ObjectKey> + Send + Sync + 'static,
    ) -> Self {
        self.mapper = Box::new(mapper);
        self
    }

    /// Last object seen under `key`.
    pub fn cached(&self, key: &ObjectKey) -> Option<&T> {
        self.cache.get(key)
    }

    fn transition(&mut self, key: &ObjectKey, new: Option<T>) -> Option<ObjectKey> {
        let old = match &new {
            Some(obj) => self.cache.insert(key.clone(), obj.clone()),
            None => self.cache.remove(key),
        };
        if !(self.predicate)(old.as_ref(), new.as_ref()) {
            trace!(kind = %T::KIND, %key, "change filtered by predicate");
            return None;
        }
        new.as_ref().or(old.as_ref()).and_then(|obj| (self.mapper)(obj))
    }
}

impl<T: Resource> Source for Informer<T> {
    fn kind(&self) -> Kind {
        T::KIND
    }

    fn handle(&mut self, event: &WatchEvent) -> StateResult<Option<ObjectKey>> {
        if event.kind != T::KIND {
            return Ok(None);
        }
        let new = match event.change {
            Change::Deleted => None,
            Change::Applied => self
                .store
                .get::<T>(&event.key.namespace, &event.key.name)?,
        };
        Ok(self.transition(&event.key, new))
    }

    fn relist(&mut self) -> StateResult<Vec<ObjectKey>> {
        let fresh: Vec<T> = self.store.list(None)?;
        let mut seen: HashMap<ObjectKey, T> = fresh.into_iter().map(|o| (o.key(), o)).collect();

        let gone: Vec<ObjectKey> = self
            .cache
            .keys()
            .filter(|k| !seen.contains_key(*k))
            .cloned()
            .collect();

        let mut keys = Vec::new();
        for key in gone {
            keys.extend(self.transition(&key, None));
        }
        let mut present: Vec<ObjectKey> = seen.keys().cloned().collect();
        present.sort();
        for key in present {
            let obj = seen.remove(&key);
            keys.extend(self.transition(&key, obj));
        }
        keys.dedup();
        Ok(keys)
    }
}
