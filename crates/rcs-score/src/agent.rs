//! ScoreAgent — keeps one site's `resource-usage-score` record current.
//!
//! Inventory (Node and Pod records) is read from the site's namespace in the
//! inventory store; the score record is written to the same namespace on the
//! hub. Both default to one store, which is how standalone mode runs.

use std::time::Duration;

use rcs_core::names;
use rcs_state::{
    AddOnPlacementScore, AddOnPlacementScoreItem, Kind, Node, ObjectMeta, Pod, StateStore,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::calculate::{ResourceScores, ScoreBounds, score};
use crate::error::ScoreResult;

pub struct ScoreAgent {
    inventory: StateStore,
    hub: StateStore,
    cluster_name: String,
    bounds: ScoreBounds,
    enable_overhead: bool,
}

impl ScoreAgent {
    pub fn new(store: StateStore, cluster_name: impl Into<String>, bounds: ScoreBounds) -> Self {
        Self {
            inventory: store.clone(),
            hub: store,
            cluster_name: cluster_name.into(),
            bounds,
            enable_overhead: true,
        }
    }

    /// Read nodes and pods from a store other than the hub.
    pub fn with_inventory(mut self, inventory: StateStore) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_pod_overhead(mut self, enabled: bool) -> Self {
        self.enable_overhead = enabled;
        self
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Current scores computed from the site inventory.
    pub fn calculate(&self) -> ScoreResult<ResourceScores> {
        let nodes: Vec<Node> = self.inventory.list(Some(&self.cluster_name))?;
        let pods: Vec<Pod> = self.inventory.list(Some(&self.cluster_name))?;
        Ok(score(&nodes, &pods, &self.bounds, self.enable_overhead))
    }

    /// Recompute and publish. Returns whether the record was written.
    pub fn refresh(&self) -> ScoreResult<bool> {
        let scores = self.calculate()?;
        let items = vec![
            AddOnPlacementScoreItem {
                name: names::SCORE_CPU_AVAILABLE.into(),
                value: scores.cpu,
            },
            AddOnPlacementScoreItem {
                name: names::SCORE_MEM_AVAILABLE.into(),
                value: scores.memory,
            },
        ];

        match self
            .hub
            .get::<AddOnPlacementScore>(&self.cluster_name, names::PLACEMENT_SCORE_NAME)?
        {
            None => {
                let mut record = AddOnPlacementScore {
                    metadata: ObjectMeta::new(&self.cluster_name, names::PLACEMENT_SCORE_NAME),
                    ..Default::default()
                };
                record.status.scores = items;
                self.hub.create(&record)?;
                info!(site = %self.cluster_name, cpu = scores.cpu, memory = scores.memory, "score record created");
                Ok(true)
            }
            Some(record) if record.status.scores == items => Ok(false),
            Some(mut record) => {
                record.status.scores = items;
                self.hub.update(&record)?;
                debug!(site = %self.cluster_name, cpu = scores.cpu, memory = scores.memory, "score record updated");
                Ok(true)
            }
        }
    }

    /// Refresh every `interval` and on inventory changes until shutdown.
    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(site = %self.cluster_name, ?interval, "score agent started");
        let mut events = self.inventory.watch();
        let mut ticker = tokio::time::interval(interval);

        loop {
            let wake = tokio::select! {
                _ = ticker.tick() => true,
                received = events.recv() => match received {
                    Ok(event) => matches!(event.kind, Kind::Node | Kind::Pod)
                        && event.key.namespace == self.cluster_name,
                    Err(RecvError::Lagged(_)) => true,
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.changed() => break,
            };
            if wake && let Err(e) = self.refresh() {
                warn!(site = %self.cluster_name, error = %e, "score refresh failed");
            }
        }
        info!(site = %self.cluster_name, "score agent stopped");
    }
}
