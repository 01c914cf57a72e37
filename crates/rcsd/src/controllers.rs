//! Hub controller wiring.
//!
//! Three controllers share one store:
//! - **placement** — Capps without a site, via [`should_schedule`]
//! - **sync** — placed or deleting Capps, plus bundle spec drift
//! - **status** — placed Capps, plus bundle feedback changes
//!
//! An event expiry sweep runs beside them unless the TTL is 0.

use std::time::Duration;

use rcs_controller::{Controller, EventRecorder, Informer};
use rcs_core::config::{ControllerConfig, RcsConfigSeed};
use rcs_placement::{PlacementReconciler, should_schedule};
use rcs_state::{Capp, ManifestWork, RcsConfig, RcsConfigSpec, StateResult, StateStore};
use rcs_status::{StatusReconciler, should_project};
use rcs_sync::{SyncReconciler, should_sync};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Upper bound on the time between event expiry sweeps.
pub const EVENT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Bundle changes the sync controller must correct.
pub fn bundle_spec_changed(old: Option<&ManifestWork>, new: Option<&ManifestWork>) -> bool {
    match (old, new) {
        (Some(old), Some(new)) => old.spec != new.spec,
        _ => true,
    }
}

/// Bundle changes carrying new feedback for the status controller.
pub fn bundle_feedback_changed(old: Option<&ManifestWork>, new: Option<&ManifestWork>) -> bool {
    match (old, new) {
        (Some(old), Some(new)) => old.status != new.status,
        (None, Some(new)) => !new.status.resource_status.manifests.is_empty(),
        _ => false,
    }
}

/// Upsert the RCSConfig singleton from the daemon config.
pub fn seed_rcs_config(store: &StateStore, seed: &RcsConfigSeed) -> StateResult<RcsConfig> {
    let mut spec = RcsConfigSpec {
        placements_namespace: seed.placements_namespace.clone(),
        placements: seed.placements.clone(),
        invalid_hostname_patterns: seed.invalid_hostname_patterns.clone(),
        ..Default::default()
    };
    // Keep operator-set defaults the seed has no field for.
    if let Some(existing) = store.get::<RcsConfig>(
        rcs_core::names::RCS_CONFIG_NAMESPACE,
        rcs_core::names::RCS_CONFIG_NAME,
    )? {
        spec.default_resources = existing.spec.default_resources;
    }
    let stored = store.apply(&RcsConfig::new(spec))?;
    info!(placements = ?stored.spec.placements, "rcsconfig seeded");
    Ok(stored)
}

/// Start the placement, sync and status controllers and the event sweep.
pub fn spawn_controllers(
    store: &StateStore,
    config: &ControllerConfig,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let placement = PlacementReconciler::new(
        store.clone(),
        EventRecorder::new(store.clone(), "rcs-placement"),
    )
    .with_backoffs(config.decision_backoff(), config.conflict_backoff());
    let placement = Controller::new(placement, store.clone())
        .watches(Informer::<Capp>::new(store.clone()).with_predicate(should_schedule))
        .with_workers(config.workers)
        .with_resync(config.resync());

    let sync = SyncReconciler::new(store.clone(), EventRecorder::new(store.clone(), "rcs-sync"))
        .with_backoffs(config.conflict_backoff(), config.deletion_requeue());
    let sync = Controller::new(sync, store.clone())
        .watches(Informer::<Capp>::new(store.clone()).with_predicate(should_sync))
        .watches(
            Informer::<ManifestWork>::new(store.clone())
                .with_predicate(bundle_spec_changed)
                .with_mapper(ManifestWork::capp_key),
        )
        .with_workers(config.workers)
        .with_resync(config.resync());

    let status = StatusReconciler::new(store.clone())
        .with_conflict_backoff(config.conflict_backoff());
    let status = Controller::new(status, store.clone())
        .watches(Informer::<Capp>::new(store.clone()).with_predicate(should_project))
        .watches(
            Informer::<ManifestWork>::new(store.clone())
                .with_predicate(bundle_feedback_changed)
                .with_mapper(ManifestWork::capp_key),
        )
        .with_workers(config.workers)
        .with_resync(config.resync());

    let mut handles = vec![
        tokio::spawn(placement.run(shutdown.clone())),
        tokio::spawn(sync.run(shutdown.clone())),
        tokio::spawn(status.run(shutdown.clone())),
    ];
    if let Some(ttl) = config.event_ttl() {
        let interval = ttl.min(EVENT_SWEEP_INTERVAL);
        handles.push(tokio::spawn(rcs_controller::run_expiry(
            store.clone(),
            ttl,
            interval,
            shutdown.clone(),
        )));
    }
    handles
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcs_state::{FeedbackValue, FieldValue, ManifestCondition, ObjectMeta};

    fn bundle() -> ManifestWork {
        ManifestWork {
            metadata: ObjectMeta::new("site-7", "mw-create-ns1-app-x"),
            ..Default::default()
        }
    }

    #[test]
    fn spec_predicate_ignores_status_only_changes() {
        let old = bundle();
        let mut new = old.clone();
        new.status.resource_status.manifests.push(ManifestCondition::default());
        assert!(!bundle_spec_changed(Some(&old), Some(&new)));
        assert!(bundle_feedback_changed(Some(&old), Some(&new)));

        new.spec.workload.manifests.push(serde_json::json!({"kind": "Namespace"}));
        assert!(bundle_spec_changed(Some(&old), Some(&new)));
        assert!(bundle_spec_changed(Some(&old), None));
    }

    #[test]
    fn feedback_predicate_skips_empty_and_removed_bundles() {
        let empty = bundle();
        assert!(!bundle_feedback_changed(None, Some(&empty)));
        assert!(!bundle_feedback_changed(Some(&empty), None));

        let mut reported = bundle();
        let mut condition = ManifestCondition::default();
        condition.status_feedbacks.values.push(FeedbackValue {
            name: "site".into(),
            field_value: FieldValue::String {
                string: "site-7".into(),
            },
        });
        reported.status.resource_status.manifests.push(condition);
        assert!(bundle_feedback_changed(None, Some(&reported)));
    }

    #[test]
    fn seeding_is_an_upsert() {
        let store = StateStore::open_in_memory().unwrap();
        let seed = RcsConfigSeed {
            placements: vec!["pool-a".into()],
            ..Default::default()
        };
        seed_rcs_config(&store, &seed).unwrap();
        let seed = RcsConfigSeed {
            placements: vec!["pool-a".into(), "pool-b".into()],
            placements_namespace: "placements".into(),
            ..Default::default()
        };
        let stored = seed_rcs_config(&store, &seed).unwrap();
        assert!(stored.is_placement("pool-b"));
        assert_eq!(stored.placements_namespace(), "placements");
    }
}
