//! PlacementReconciler — resolves and persists a Capp's site binding.
//!
//! The binding is one update carrying both `status.applicationLinks.site`
//! and the has-placement annotation, so the two can never diverge. When the
//! decision engine has not produced a usable decision yet, the Capp is
//! requeued after a fixed backoff rather than failed.

use std::time::Duration;

use rcs_controller::{Action, EventRecorder, Reconciler};
use rcs_core::names;
use rcs_state::{
    Capp, ObjectKey, Placement, PlacementDecision, RcsConfig, StateStore,
};
use tracing::{debug, info};

use crate::decision::{Target, pick_site, resolve_target};
use crate::error::{PlacementError, PlacementResult};

/// Default wait before re-checking for decisions.
pub const DEFAULT_DECISION_BACKOFF: Duration = Duration::from_secs(10);

/// Default wait after losing a write race on the Capp.
pub const DEFAULT_CONFLICT_BACKOFF: Duration = Duration::from_secs(2);

pub struct PlacementReconciler {
    store: StateStore,
    recorder: EventRecorder,
    decision_backoff: Duration,
    conflict_backoff: Duration,
}

impl PlacementReconciler {
    pub fn new(store: StateStore, recorder: EventRecorder) -> Self {
        Self {
            store,
            recorder,
            decision_backoff: DEFAULT_DECISION_BACKOFF,
            conflict_backoff: DEFAULT_CONFLICT_BACKOFF,
        }
    }

    pub fn with_backoffs(mut self, decision: Duration, conflict: Duration) -> Self {
        self.decision_backoff = decision;
        self.conflict_backoff = conflict;
        self
    }

    /// Schedule one Capp.
    ///
    /// Missing scheduling inputs are reported as a Warning event on the Capp
    /// before the error is returned.
    pub fn schedule(&self, key: &ObjectKey) -> PlacementResult<Action> {
        let Some(mut capp) = self.store.get::<Capp>(&key.namespace, &key.name)? else {
            debug!(capp = %key, "capp gone, nothing to schedule");
            return Ok(Action::Done);
        };
        if capp.metadata.is_deleting() {
            return Ok(Action::Done);
        }
        if let Some(site) = capp.placement() {
            debug!(capp = %key, site, "already placed");
            return Ok(Action::Done);
        }

        let result = self.bind(key, &mut capp);
        if let Err(e) = &result
            && let Some(reason) = e.reason()
        {
            self.recorder.warning(&capp, reason, &e.to_string());
        }
        result
    }

    fn bind(&self, key: &ObjectKey, capp: &mut Capp) -> PlacementResult<Action> {
        let config = self
            .store
            .get::<RcsConfig>(names::RCS_CONFIG_NAMESPACE, names::RCS_CONFIG_NAME)?
            .ok_or_else(|| PlacementError::ConfigMissing {
                namespace: names::RCS_CONFIG_NAMESPACE.to_string(),
                name: names::RCS_CONFIG_NAME.to_string(),
            })?;

        let site = match resolve_target(&capp.spec.site, &config)? {
            Target::Pinned(site) => site,
            Target::Policy(policy) => match self.decide(capp, &config, &policy)? {
                Some(site) => site,
                None => return Ok(Action::RequeueAfter(self.decision_backoff)),
            },
        };

        capp.status.application_links.site = site.clone();
        capp.metadata
            .annotations
            .insert(names::ANNOTATION_HAS_PLACEMENT.to_string(), site.clone());

        match self.store.update(&*capp) {
            Ok(_) => {}
            Err(e) if e.is_conflict() => {
                info!(capp = %key, "conflict while binding site, retrying shortly");
                return Ok(Action::RequeueAfter(self.conflict_backoff));
            }
            Err(e) => return Err(e.into()),
        }

        info!(capp = %key, %site, "capp scheduled");
        self.recorder.normal(
            &*capp,
            names::REASON_CAPP_SCHEDULED,
            &format!("Scheduled Capp {:?} on managed cluster {:?}", key.name, site),
        );
        Ok(Action::Done)
    }

    /// Read the policy's decisions; `None` when none is usable yet.
    fn decide(
        &self,
        capp: &Capp,
        config: &RcsConfig,
        policy: &str,
    ) -> PlacementResult<Option<String>> {
        let namespace = config.placements_namespace();

        if self.store.get::<Placement>(namespace, policy)?.is_none() {
            return Err(PlacementError::PolicyMissing {
                namespace: namespace.to_string(),
                name: policy.to_string(),
            });
        }

        let decisions: Vec<PlacementDecision> = self
            .store
            .list_labeled(namespace, &[(names::LABEL_PLACEMENT, policy)])?;

        let site = pick_site(&decisions);
        if site.is_none() {
            self.recorder.warning(
                capp,
                names::REASON_DECISION_NOT_SATISFIED,
                &format!("No managed cluster available yet for placement {policy:?}"),
            );
        }
        Ok(site)
    }
}

impl Reconciler for PlacementReconciler {
    type Error = PlacementError;

    fn name(&self) -> &'static str {
        "placement"
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<Action, PlacementError> {
        self.schedule(key)
    }
}
