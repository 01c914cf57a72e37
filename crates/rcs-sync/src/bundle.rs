//! ManifestWork reconciliation for one Capp.
//!
//! The bundle lives in the namespace named after the bound site under a
//! deterministic name. It is created on first sync and afterwards has its
//! manifests and feedback rules replaced wholesale.

use rcs_controller::EventRecorder;
use rcs_core::names;
use rcs_state::{
    Capp, FeedbackRule, JsonPath, ManifestConfigOption, ManifestWork, ManifestWorkSpec,
    ManifestsTemplate, ObjectMeta, Resource, ResourceIdentifier, StateStore,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};

/// What [`sync_bundle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleOutcome {
    Created,
    Updated,
    Unchanged,
    /// Someone else wrote the bundle first; retry later.
    Conflict,
}

/// Status feedback rules for the Capp copy inside the bundle.
pub fn feedback_configs(capp: &Capp) -> Vec<ManifestConfigOption> {
    vec![ManifestConfigOption {
        resource_identifier: ResourceIdentifier {
            group: names::GROUP.to_string(),
            resource: names::CAPP_RESOURCE.to_string(),
            namespace: capp.metadata.namespace.clone(),
            name: capp.metadata.name.clone(),
        },
        feedback_rules: vec![FeedbackRule {
            type_: names::FEEDBACK_RULE_JSON_PATHS.to_string(),
            json_paths: names::CAPP_FEEDBACK_PATHS
                .iter()
                .map(|(name, path)| JsonPath {
                    name: name.to_string(),
                    path: path.to_string(),
                })
                .collect(),
        }],
    }]
}

/// A fresh bundle for `capp` at `site`.
pub fn new_bundle(capp: &Capp, site: &str, manifests: Vec<Value>) -> ManifestWork {
    let mut metadata = ObjectMeta::new(
        site,
        names::manifest_work_name(&capp.metadata.namespace, &capp.metadata.name),
    );
    metadata.annotations.insert(
        names::ANNOTATION_CAPP_NAME.to_string(),
        capp.metadata.name.clone(),
    );
    metadata.annotations.insert(
        names::ANNOTATION_CAPP_NAMESPACE.to_string(),
        capp.metadata.namespace.clone(),
    );
    ManifestWork {
        metadata,
        spec: ManifestWorkSpec {
            workload: ManifestsTemplate { manifests },
            manifest_configs: feedback_configs(capp),
        },
        ..Default::default()
    }
}

/// Create or update the bundle so it carries exactly `manifests`.
pub fn sync_bundle(
    store: &StateStore,
    recorder: &EventRecorder,
    capp: &Capp,
    site: &str,
    manifests: Vec<Value>,
) -> SyncResult<BundleOutcome> {
    let name = names::manifest_work_name(&capp.metadata.namespace, &capp.metadata.name);

    let Some(mut existing) = store.get::<ManifestWork>(site, &name)? else {
        let bundle = new_bundle(capp, site, manifests);
        return match store.create(&bundle) {
            Ok(_) => {
                let message = format!(
                    "Created ManifestWork {:?} for Capp {:?}",
                    name, capp.metadata.name
                );
                info!(capp = %capp.key(), site, bundle = %name, "bundle created");
                recorder.normal(capp, names::REASON_MANIFEST_WORK_CREATED, &message);
                Ok(BundleOutcome::Created)
            }
            Err(source) => {
                recorder.warning(capp, names::REASON_MANIFEST_WORK_FAILED, &source.to_string());
                Err(SyncError::BundleCreate {
                    namespace: site.to_string(),
                    name,
                    source,
                })
            }
        };
    };

    let configs = feedback_configs(capp);
    if existing.spec.workload.manifests == manifests && existing.spec.manifest_configs == configs {
        debug!(capp = %capp.key(), site, bundle = %name, "bundle up to date");
        return Ok(BundleOutcome::Unchanged);
    }

    existing.spec.workload.manifests = manifests;
    existing.spec.manifest_configs = configs;
    match store.update(&existing) {
        Ok(_) => {
            debug!(capp = %capp.key(), site, bundle = %name, "bundle updated");
            Ok(BundleOutcome::Updated)
        }
        Err(e) if e.is_conflict() => {
            info!(bundle = %name, "conflict while updating ManifestWork, trying again shortly");
            Ok(BundleOutcome::Conflict)
        }
        Err(source) => Err(SyncError::BundleUpdate {
            namespace: site.to_string(),
            name,
            source,
        }),
    }
}
