//! SyncReconciler — keeps a placed Capp's bundle in step with the Capp.

use std::time::Duration;

use rcs_controller::{Action, EventRecorder, Reconciler};
use rcs_core::names;
use rcs_state::{Capp, Condition, ObjectKey, StateStore, epoch_secs, set_condition};
use tracing::{debug, warn};

use crate::bundle::{BundleOutcome, sync_bundle};
use crate::director::{CappDirector, DirectorContext};
use crate::error::{SyncError, SyncResult};
use crate::finalizer::{ensure_finalizer, handle_deletion};

pub const DEFAULT_CONFLICT_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_DELETION_REQUEUE: Duration = Duration::from_secs(2);

const REASON_VOLUMES_FOUND: &str = "VolumesFound";

pub struct SyncReconciler {
    store: StateStore,
    recorder: EventRecorder,
    director: CappDirector,
    conflict_backoff: Duration,
    deletion_requeue: Duration,
}

impl SyncReconciler {
    pub fn new(store: StateStore, recorder: EventRecorder) -> Self {
        Self {
            store,
            recorder,
            director: CappDirector::default(),
            conflict_backoff: DEFAULT_CONFLICT_BACKOFF,
            deletion_requeue: DEFAULT_DELETION_REQUEUE,
        }
    }

    pub fn with_director(mut self, director: CappDirector) -> Self {
        self.director = director;
        self
    }

    pub fn with_backoffs(mut self, conflict: Duration, deletion: Duration) -> Self {
        self.conflict_backoff = conflict;
        self.deletion_requeue = deletion;
        self
    }

    /// Sync one Capp's bundle, or tear it down if the Capp is deleting.
    pub fn sync(&self, key: &ObjectKey) -> SyncResult<Action> {
        let Some(capp) = self.store.get::<Capp>(&key.namespace, &key.name)? else {
            return Ok(Action::Done);
        };

        if capp.metadata.is_deleting() {
            handle_deletion(&self.store, capp)?;
            return Ok(Action::RequeueAfter(self.deletion_requeue));
        }

        let Some(site) = capp.placement().map(str::to_string) else {
            debug!(capp = %key, "not placed yet");
            return Ok(Action::Done);
        };

        let capp = match ensure_finalizer(&self.store, capp) {
            Ok(capp) => capp,
            Err(SyncError::State(e)) if e.is_conflict() => {
                return Ok(Action::RequeueAfter(self.conflict_backoff));
            }
            Err(e) => return Err(e),
        };

        let ctx = DirectorContext::new(self.store.clone(), self.recorder.clone(), &capp);
        let manifests = match self.director.assemble(&ctx, &capp) {
            Ok(manifests) => manifests,
            Err(e) => {
                if e.is_volume_error() {
                    let condition = Condition::new(
                        names::CONDITION_VOLUMES_AVAILABLE,
                        false,
                        names::REASON_VOLUME_NOT_FOUND,
                        &e.to_string(),
                    );
                    if let Err(write) = self.write_condition(capp, condition) {
                        warn!(capp = %key, error = %write, "could not record volume condition");
                    }
                }
                return Err(e);
            }
        };

        let condition = Condition::new(
            names::CONDITION_VOLUMES_AVAILABLE,
            true,
            REASON_VOLUMES_FOUND,
            "",
        );
        let capp = match self.write_condition(capp, condition) {
            Ok(capp) => capp,
            Err(SyncError::State(e)) if e.is_conflict() => {
                return Ok(Action::RequeueAfter(self.conflict_backoff));
            }
            Err(e) => return Err(e),
        };

        match sync_bundle(&self.store, &self.recorder, &capp, &site, manifests)? {
            BundleOutcome::Conflict => Ok(Action::RequeueAfter(self.conflict_backoff)),
            _ => Ok(Action::Done),
        }
    }

    /// Store the condition if it changed anything.
    fn write_condition(&self, mut capp: Capp, condition: Condition) -> SyncResult<Capp> {
        if !set_condition(&mut capp.status.conditions, condition, epoch_secs()) {
            return Ok(capp);
        }
        Ok(self.store.update(&capp)?)
    }
}

impl Reconciler for SyncReconciler {
    type Error = SyncError;

    fn name(&self) -> &'static str {
        "sync"
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<Action, SyncError> {
        self.sync(key)
    }
}
