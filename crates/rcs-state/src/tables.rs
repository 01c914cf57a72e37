//! redb table definitions for the RCS object store.
//!
//! Object tables use `{namespace}/{name}` keys and JSON `&[u8]` values.
//! Cluster-scoped objects use an empty namespace, so their key is `/{name}`.

use redb::TableDefinition;

use crate::types::Kind;

pub const CAPPS: TableDefinition<&str, &[u8]> = TableDefinition::new("capps");
pub const RCS_CONFIGS: TableDefinition<&str, &[u8]> = TableDefinition::new("rcs_configs");
pub const PLACEMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("placements");
pub const PLACEMENT_DECISIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("placement_decisions");
pub const MANIFEST_WORKS: TableDefinition<&str, &[u8]> = TableDefinition::new("manifest_works");
pub const CONFIG_MAPS: TableDefinition<&str, &[u8]> = TableDefinition::new("config_maps");
pub const SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("secrets");
pub const ROLE_BINDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("role_bindings");
pub const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");
pub const PODS: TableDefinition<&str, &[u8]> = TableDefinition::new("pods");
pub const PLACEMENT_SCORES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("placement_scores");
pub const EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("events");

/// Store bookkeeping (the resource version counter).
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

pub const RESOURCE_VERSION_KEY: &str = "resource_version";

impl Kind {
    pub(crate) fn table(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self {
            Kind::Capp => CAPPS,
            Kind::RcsConfig => RCS_CONFIGS,
            Kind::Placement => PLACEMENTS,
            Kind::PlacementDecision => PLACEMENT_DECISIONS,
            Kind::ManifestWork => MANIFEST_WORKS,
            Kind::ConfigMap => CONFIG_MAPS,
            Kind::Secret => SECRETS,
            Kind::RoleBinding => ROLE_BINDINGS,
            Kind::Node => NODES,
            Kind::Pod => PODS,
            Kind::PlacementScore => PLACEMENT_SCORES,
            Kind::Event => EVENTS,
        }
    }
}
