//! Event recorder — the observability side channel.
//!
//! Events are logged through `tracing` and persisted as `Event` records in
//! the involved object's namespace. Repeats of the same (object, reason,
//! message) triple bump a counter on one record instead of piling up. The
//! recorder never fails its caller: storage errors are logged and dropped.
//!
//! Events expire once they have not recurred for a TTL; [`run_expiry`] sweeps
//! them so records of deleted objects do not accumulate.

use std::time::Duration;

use rcs_state::{
    Event, EventType, ObjectMeta, ObjectReference, Resource, StateError, StateResult, StateStore,
    epoch_secs,
};
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default event lifetime after the last occurrence.
pub const DEFAULT_EVENT_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct EventRecorder {
    store: StateStore,
    component: String,
}

impl EventRecorder {
    pub fn new(store: StateStore, component: &str) -> Self {
        Self {
            store,
            component: component.to_string(),
        }
    }

    pub fn normal<T: Resource>(&self, obj: &T, reason: &str, message: &str) {
        self.record(obj, EventType::Normal, reason, message);
    }

    pub fn warning<T: Resource>(&self, obj: &T, reason: &str, message: &str) {
        self.record(obj, EventType::Warning, reason, message);
    }

    fn record<T: Resource>(&self, obj: &T, type_: EventType, reason: &str, message: &str) {
        let involved = ObjectReference {
            kind: T::KIND.as_str().to_string(),
            namespace: obj.meta().namespace.clone(),
            name: obj.meta().name.clone(),
        };

        match type_ {
            EventType::Normal => info!(
                component = %self.component,
                kind = %involved.kind,
                object = %obj.key(),
                reason,
                "{message}"
            ),
            EventType::Warning => warn!(
                component = %self.component,
                kind = %involved.kind,
                object = %obj.key(),
                reason,
                "{message}"
            ),
        }

        if let Err(e) = self.persist(involved, type_, reason, message) {
            debug!(error = %e, reason, "event not persisted");
        }
    }

    fn persist(
        &self,
        involved: ObjectReference,
        type_: EventType,
        reason: &str,
        message: &str,
    ) -> Result<(), StateError> {
        let name = event_name(&involved, reason, message);
        let now = epoch_secs();

        if let Some(mut existing) = self.store.get::<Event>(&involved.namespace, &name)? {
            existing.count = existing.count.saturating_add(1);
            existing.last_timestamp = now;
            self.store.update(&existing)?;
            return Ok(());
        }

        let event = Event {
            metadata: ObjectMeta::new(involved.namespace.clone(), name),
            involved_object: involved,
            type_,
            reason: reason.to_string(),
            message: message.to_string(),
            count: 1,
            first_timestamp: now,
            last_timestamp: now,
        };
        self.store.create(&event)?;
        Ok(())
    }
}

/// Delete every event last seen more than `ttl` before `now` (epoch seconds).
/// Returns how many were removed.
pub fn expire_events(store: &StateStore, ttl: Duration, now: u64) -> StateResult<usize> {
    let cutoff = now.saturating_sub(ttl.as_secs());
    let mut removed = 0;
    for event in store.list::<Event>(None)? {
        if event.last_timestamp >= cutoff {
            continue;
        }
        match store.delete::<Event>(&event.metadata.namespace, &event.metadata.name) {
            Ok(_) => removed += 1,
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

/// Sweep expired events every `interval` until shutdown.
pub async fn run_expiry(
    store: StateStore,
    ttl: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(?ttl, ?interval, "event expiry started");
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        match expire_events(&store, ttl, epoch_secs()) {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "expired events deleted"),
            Err(e) => warn!(error = %e, "event expiry failed"),
        }
    }
    info!("event expiry stopped");
}

/// `<object>.<digest>`: stable for a given object, reason and message.
fn event_name(involved: &ObjectReference, reason: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [
        involved.kind.as_str(),
        involved.namespace.as_str(),
        involved.name.as_str(),
        reason,
        message,
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hex::encode(hasher.finalize());
    format!("{}.{}", involved.name, &digest[..16])
}
