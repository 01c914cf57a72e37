//! Site-side agents: the resource scorer and the work agent, per site.

use std::time::Duration;

use rcs_core::config::ScoreConfig;
use rcs_score::{ScoreAgent, ScoreBounds};
use rcs_status::WorkAgent;
use rcs_state::StateStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Periodic feedback pass; bundle writes also wake the agent.
pub const WORK_AGENT_RESYNC: Duration = Duration::from_secs(30);

/// Start a score agent and a work agent for every site.
pub fn spawn_site_agents(
    store: &StateStore,
    sites: &[String],
    score: &ScoreConfig,
    bounds: ScoreBounds,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(sites.len() * 2);
    for site in sites {
        info!(site = %site, "starting site agents");
        let scorer = ScoreAgent::new(store.clone(), site.clone(), bounds)
            .with_pod_overhead(score.enable_pod_overhead);
        handles.push(tokio::spawn(scorer.run(score.interval(), shutdown.clone())));

        let worker = WorkAgent::new(store.clone(), site.clone());
        handles.push(tokio::spawn(worker.run(WORK_AGENT_RESYNC, shutdown.clone())));
    }
    handles
}

/// Sites from the config file and the command line, deduplicated in order.
pub fn merge_sites(configured: &[String], extra: &[String]) -> Vec<String> {
    let mut sites: Vec<String> = Vec::new();
    for site in configured.iter().chain(extra) {
        if !site.is_empty() && !sites.contains(site) {
            sites.push(site.clone());
        }
    }
    sites
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_first_occurrence() {
        let merged = merge_sites(
            &["site-7".into(), "site-9".into()],
            &["site-9".into(), "".into(), "site-3".into()],
        );
        assert_eq!(merged, vec!["site-7", "site-9", "site-3"]);
    }
}
