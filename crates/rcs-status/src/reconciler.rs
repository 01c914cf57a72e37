//! StatusReconciler — copies bundle feedback onto the owning Capp.

use std::time::Duration;

use rcs_controller::{Action, Reconciler};
use rcs_core::names;
use rcs_state::{Capp, ManifestWork, ObjectKey, StateStore};
use tracing::{debug, info};

use crate::error::{StatusError, StatusResult};
use crate::feedback::values_for;
use crate::projector::project;

pub const DEFAULT_CONFLICT_BACKOFF: Duration = Duration::from_secs(2);

/// Capp events worth projecting: live, placed Capps.
pub fn should_project(_old: Option<&Capp>, new: Option<&Capp>) -> bool {
    new.is_some_and(|capp| capp.placement().is_some() && !capp.metadata.is_deleting())
}

pub struct StatusReconciler {
    store: StateStore,
    conflict_backoff: Duration,
}

impl StatusReconciler {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            conflict_backoff: DEFAULT_CONFLICT_BACKOFF,
        }
    }

    pub fn with_conflict_backoff(mut self, backoff: Duration) -> Self {
        self.conflict_backoff = backoff;
        self
    }

    /// Project the bundle's feedback for one Capp. Writes at most once.
    pub fn project(&self, key: &ObjectKey) -> StatusResult<Action> {
        let Some(capp) = self.store.get::<Capp>(&key.namespace, &key.name)? else {
            return Ok(Action::Done);
        };
        let Some(site) = capp.placement() else {
            return Ok(Action::Done);
        };

        let bundle_name = names::manifest_work_name(&key.namespace, &key.name);
        let Some(bundle) = self.store.get::<ManifestWork>(site, &bundle_name)? else {
            debug!(capp = %key, site, "no bundle yet");
            return Ok(Action::Done);
        };
        let Some(values) = values_for(&bundle, names::CAPP_KIND, &key.name) else {
            debug!(capp = %key, site, "site has not reported feedback yet");
            return Ok(Action::Done);
        };

        // Project onto the freshest copy.
        let Some(mut capp) = self.store.get::<Capp>(&key.namespace, &key.name)? else {
            return Ok(Action::Done);
        };
        if capp.metadata.is_deleting() {
            return Ok(Action::Done);
        }

        let status = project(&capp.status, values);
        if status == capp.status {
            return Ok(Action::Done);
        }
        capp.status = status;
        match self.store.update(&capp) {
            Ok(_) => {
                info!(capp = %key, "status updated from site feedback");
                Ok(Action::Done)
            }
            Err(e) if e.is_conflict() => Ok(Action::RequeueAfter(self.conflict_backoff)),
            Err(e) => Err(e.into()),
        }
    }
}

impl Reconciler for StatusReconciler {
    type Error = StatusError;

    fn name(&self) -> &'static str {
        "status"
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<Action, StatusError> {
        self.project(key)
    }
}
