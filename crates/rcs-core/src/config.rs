//! rcsd.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level daemon configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub controller: ControllerConfig,
    pub score: ScoreConfig,
    /// Seed for the RCSConfig singleton, upserted at startup when present.
    pub rcs_config: Option<RcsConfigSeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Concurrent reconciles per controller.
    pub workers: usize,
    /// Full relist period; 0 disables.
    pub resync_secs: u64,
    pub decision_backoff_secs: u64,
    pub conflict_backoff_secs: u64,
    pub deletion_requeue_secs: u64,
    /// Event lifetime after the last occurrence; 0 keeps events forever.
    pub event_ttl_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            resync_secs: 300,
            decision_backoff_secs: 10,
            conflict_backoff_secs: 2,
            deletion_requeue_secs: 2,
            event_ttl_secs: 3600,
        }
    }
}

impl ControllerConfig {
    pub fn resync(&self) -> Option<Duration> {
        (self.resync_secs > 0).then(|| Duration::from_secs(self.resync_secs))
    }

    pub fn decision_backoff(&self) -> Duration {
        Duration::from_secs(self.decision_backoff_secs)
    }

    pub fn conflict_backoff(&self) -> Duration {
        Duration::from_secs(self.conflict_backoff_secs)
    }

    pub fn deletion_requeue(&self) -> Duration {
        Duration::from_secs(self.deletion_requeue_secs)
    }

    pub fn event_ttl(&self) -> Option<Duration> {
        (self.event_ttl_secs > 0).then(|| Duration::from_secs(self.event_ttl_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub interval_secs: u64,
    /// Sites that get an in-process score agent in standalone mode.
    pub sites: Vec<String>,
    pub enable_pod_overhead: bool,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            sites: Vec::new(),
            enable_pod_overhead: true,
        }
    }
}

impl ScoreConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcsConfigSeed {
    pub placements_namespace: String,
    pub placements: Vec<String>,
    pub invalid_hostname_patterns: Vec<String>,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
