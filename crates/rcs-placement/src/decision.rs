//! Target resolution and candidate selection.
//!
//! A Capp's `spec.site` is either a literal managed cluster, the name of a
//! configured placement policy, or empty (use the first configured policy).
//! For policies, the site is taken from the policy's decision records.

use rcs_core::names::LOCAL_CLUSTER;
use rcs_state::{PlacementDecision, RcsConfig};

use crate::error::{PlacementError, PlacementResult};

/// Where a Capp's site comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Explicit site, trusted verbatim.
    Pinned(String),
    /// Placement policy whose decisions pick the site.
    Policy(String),
}

pub fn resolve_target(site: &str, config: &RcsConfig) -> PlacementResult<Target> {
    if !site.is_empty() && !config.is_placement(site) {
        return Ok(Target::Pinned(site.to_string()));
    }
    if !site.is_empty() {
        return Ok(Target::Policy(site.to_string()));
    }
    config
        .spec
        .placements
        .first()
        .map(|p| Target::Policy(p.clone()))
        .ok_or(PlacementError::NoPlacements)
}

/// Pick the site from a policy's decision records.
///
/// Only the first record is consulted. Its first candidate wins unless it is
/// the hub itself, in which case the second candidate is used. `None` means
/// no usable decision yet.
pub fn pick_site(decisions: &[PlacementDecision]) -> Option<String> {
    let candidates = &decisions.first()?.status.decisions;
    let first = candidates.first()?;
    let chosen = if first.cluster_name == LOCAL_CLUSTER {
        candidates.get(1)?
    } else {
        first
    };
    (!chosen.cluster_name.is_empty()).then(|| chosen.cluster_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcs_state::RcsConfigSpec;

    fn config(placements: &[&str]) -> RcsConfig {
        RcsConfig::new(RcsConfigSpec {
            placements: placements.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        })
    }

    fn decision(clusters: &[&str]) -> PlacementDecision {
        PlacementDecision::for_placement("default", "d", "pool-a", clusters)
    }

    #[test]
    fn literal_site_is_pinned() {
        let target = resolve_target("site-3", &config(&["pool-a"])).unwrap();
        assert_eq!(target, Target::Pinned("site-3".into()));
    }

    #[test]
    fn policy_name_resolves_to_policy() {
        let target = resolve_target("pool-b", &config(&["pool-a", "pool-b"])).unwrap();
        assert_eq!(target, Target::Policy("pool-b".into()));
    }

    #[test]
    fn empty_site_uses_default_policy() {
        let target = resolve_target("", &config(&["pool-a", "pool-b"])).unwrap();
        assert_eq!(target, Target::Policy("pool-a".into()));
    }

    #[test]
    fn empty_site_without_policies_fails() {
        assert!(matches!(
            resolve_target("", &config(&[])),
            Err(PlacementError::NoPlacements)
        ));
    }

    #[test]
    fn first_candidate_wins() {
        assert_eq!(pick_site(&[decision(&["site-1", "site-2"])]), Some("site-1".into()));
    }

    #[test]
    fn leading_local_cluster_is_skipped() {
        assert_eq!(
            pick_site(&[decision(&["local-cluster", "site-7"])]),
            Some("site-7".into())
        );
    }

    #[test]
    fn only_the_leading_sentinel_is_filtered() {
        assert_eq!(
            pick_site(&[decision(&["site-1", "local-cluster"])]),
            Some("site-1".into())
        );
    }

    #[test]
    fn no_usable_candidate() {
        assert_eq!(pick_site(&[]), None);
        assert_eq!(pick_site(&[decision(&[])]), None);
        assert_eq!(pick_site(&[decision(&["local-cluster"])]), None);
    }

    #[test]
    fn only_first_record_is_consulted() {
        let records = [decision(&[]), decision(&["site-9"])];
        assert_eq!(pick_site(&records), None);
    }

    #[test]
    fn selection_is_deterministic() {
        let records = [decision(&["site-4", "site-5", "site-6"])];
        for _ in 0..10 {
            assert_eq!(pick_site(&records), Some("site-4".into()));
        }
    }
}
