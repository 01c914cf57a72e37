//! In-process stand-in for a site's work agent.
//!
//! Real sites apply the bundle and report feedback from the running Capp.
//! In standalone mode there is no remote site, so this agent treats every
//! shipped Capp as running and healthy, derives its live status from the
//! manifest, and records feedback on the bundle the same way.

use std::time::Duration;

use rcs_core::names;
use rcs_state::{Change, Kind, ManifestWork, StateStore};
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::StatusResult;
use crate::feedback::record_feedback;

/// Live view of a shipped Capp manifest as a healthy site reports it.
pub fn simulated_live_capp(manifest: &Value, site: &str) -> Value {
    let mut live = manifest.clone();
    let name = manifest["metadata"]["name"].as_str().unwrap_or_default();
    let namespace = manifest["metadata"]["namespace"].as_str().unwrap_or_default();
    let host = match manifest["spec"]["routeSpec"]["hostname"].as_str() {
        Some(hostname) if !hostname.is_empty() => hostname.to_string(),
        _ => format!("{name}-{namespace}.{site}"),
    };
    let revision = format!("{name}-00001");
    live["status"] = json!({
        "applicationLinks": {"site": site},
        "knativeObjectStatus": {
            "observedGeneration": 1,
            "address": {"url": format!("https://{host}")},
            "latestCreatedRevisionName": revision,
            "latestReadyRevisionName": revision,
            "traffic": [{"revisionName": revision, "percent": 100, "latestRevision": true}],
        },
    });
    live
}

pub struct WorkAgent {
    store: StateStore,
    site: String,
}

impl WorkAgent {
    pub fn new(store: StateStore, site: impl Into<String>) -> Self {
        Self {
            store,
            site: site.into(),
        }
    }

    /// Report feedback for every bundle in the site namespace.
    ///
    /// Returns how many bundles had their status changed.
    pub fn reflect(&self) -> StatusResult<usize> {
        let bundles: Vec<ManifestWork> = self.store.list(Some(&self.site))?;
        let mut changed = 0;
        for mut bundle in bundles {
            if bundle.metadata.is_deleting() {
                continue;
            }
            let mut dirty = false;
            let capps: Vec<Value> = bundle
                .spec
                .workload
                .manifests
                .iter()
                .filter(|m| m["kind"] == names::CAPP_KIND)
                .map(|m| simulated_live_capp(m, &self.site))
                .collect();
            for live in &capps {
                dirty |= record_feedback(&mut bundle, live)?;
            }
            if !dirty {
                continue;
            }
            match self.store.update(&bundle) {
                Ok(_) => changed += 1,
                Err(e) if e.is_conflict() => {
                    debug!(site = %self.site, bundle = %bundle.metadata.name, "bundle moved on, retrying next pass");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(changed)
    }

    /// Reflect on bundle changes and every `interval` until shutdown.
    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(site = %self.site, "work agent started");
        let mut events = self.store.watch();
        let mut ticker = tokio::time::interval(interval);

        loop {
            let wake = tokio::select! {
                _ = ticker.tick() => true,
                received = events.recv() => match received {
                    Ok(event) => event.kind == Kind::ManifestWork
                        && event.change == Change::Applied
                        && event.key.namespace == self.site,
                    Err(RecvError::Lagged(_)) => true,
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.changed() => break,
            };
            if wake && let Err(e) = self.reflect() {
                warn!(site = %self.site, error = %e, "work agent pass failed");
            }
        }
        info!(site = %self.site, "work agent stopped");
    }
}
