//! Domain types for the RCS object store.
//!
//! These mirror the declarative records the control plane reads and
//! writes: Capps and their configuration on the hub, placement policies and
//! decisions, ManifestWork bundles, the RBAC and config objects copied into
//! bundles, site inventory for scoring, and events. Field names serialize in
//! camelCase so stored documents and synthesized manifests share one shape.
//! Maps are `BTreeMap` so serialization is byte-stable.

use std::collections::BTreeMap;
use std::fmt;

use rcs_core::Quantity;
use rcs_core::names;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ── Object identity ────────────────────────────────────────────────

/// Every stored kind. Each maps to one redb table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Capp,
    RcsConfig,
    Placement,
    PlacementDecision,
    ManifestWork,
    ConfigMap,
    Secret,
    RoleBinding,
    Node,
    Pod,
    PlacementScore,
    Event,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Capp => "Capp",
            Kind::RcsConfig => "RCSConfig",
            Kind::Placement => "Placement",
            Kind::PlacementDecision => "PlacementDecision",
            Kind::ManifestWork => "ManifestWork",
            Kind::ConfigMap => "ConfigMap",
            Kind::Secret => "Secret",
            Kind::RoleBinding => "RoleBinding",
            Kind::Node => "Node",
            Kind::Pod => "Pod",
            Kind::PlacementScore => "AddOnPlacementScore",
            Kind::Event => "Event",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(namespace, name)` pair identifying an object within its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// redb key: `{namespace}/{name}`.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Metadata common to every stored object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
    /// Optimistic concurrency token, assigned by the store on every write.
    #[serde(skip_serializing_if = "is_zero")]
    pub resource_version: u64,
    /// Soft-delete marker (unix seconds), set by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<u64>,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    /// Returns true if the finalizer was added.
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.finalizers.push(finalizer.to_string());
        true
    }

    /// Returns true if the finalizer was present.
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|f| f != finalizer);
        before != self.finalizers.len()
    }
}

/// A stored, versioned object.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: Kind;

    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        self.meta().key()
    }
}

macro_rules! impl_resource {
    ($ty:ty, $kind:expr) => {
        impl Resource for $ty {
            const KIND: Kind = $kind;

            fn meta(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

// ── Capp ───────────────────────────────────────────────────────────

/// The user-declared workload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Capp {
    pub metadata: ObjectMeta,
    pub spec: CappSpec,
    pub status: CappStatus,
}

impl_resource!(Capp, Kind::Capp);

impl Capp {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }

    /// Site recorded by the scheduler, read from the predicate annotation.
    pub fn placement(&self) -> Option<&str> {
        self.metadata
            .annotations
            .get(names::ANNOTATION_HAS_PLACEMENT)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Namespaces that may hold this Capp's bundle.
    ///
    /// The bundle is shipped to the annotated placement. The status site is
    /// whatever the remote site last reported, so it is only a fallback and
    /// is listed second when it differs.
    pub fn bundle_sites(&self) -> Vec<&str> {
        let mut sites: Vec<&str> = self.placement().into_iter().collect();
        let reported = self.status.application_links.site.as_str();
        if !reported.is_empty() && !sites.contains(&reported) {
            sites.push(reported);
        }
        sites
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CappSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scale_metric: String,
    /// Literal site, placement policy name, or empty for the default policy.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub site: String,
    pub configuration_spec: ConfigurationSpec,
    pub route_spec: RouteSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurationSpec {
    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodTemplateSpec {
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<Container>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
    /// Per-pod resource overhead (RuntimeClass).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub overhead: BTreeMap<String, Quantity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<EnvFromSource>,
    #[serde(skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRequirements {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, Quantity>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, Quantity>,
}

impl ResourceRequirements {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.limits.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvVar {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvVarSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map_key_ref: Option<KeySelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<KeySelector>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySelector {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvFromSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map_ref: Option<LocalObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<LocalObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalObjectReference {
    pub name: String,
}

impl LocalObjectReference {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Volume {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map: Option<LocalObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretVolumeSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretVolumeSource {
    pub secret_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    pub tls_enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tls_secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CappStatus {
    pub application_links: ApplicationLinks,
    pub knative_object_status: KnativeObjectStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationLinks {
    pub console_link: String,
    pub site: String,
    pub cluster_segment: String,
}

/// Serving-engine status reported back from the site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnativeObjectStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Addressable>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub latest_created_revision_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub latest_ready_revision_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub traffic: Vec<TrafficTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Addressable {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrafficTarget {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub revision_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_revision: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    /// "True", "False" or "Unknown".
    pub status: String,
    pub reason: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub last_transition_time: u64,
}

impl Condition {
    pub fn new(type_: &str, status: bool, reason: &str, message: &str) -> Self {
        Self {
            type_: type_.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: 0,
        }
    }
}

/// Insert or replace a condition by type. Returns false when nothing changed.
///
/// The transition time is only bumped when the status flips.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition, now: u64) -> bool {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status
                && existing.reason == condition.reason
                && existing.message == condition.message
            {
                return false;
            }
            condition.last_transition_time = if existing.status == condition.status {
                existing.last_transition_time
            } else {
                now
            };
            *existing = condition;
            true
        }
        None => {
            condition.last_transition_time = now;
            conditions.push(condition);
            true
        }
    }
}

// ── RCSConfig ──────────────────────────────────────────────────────

/// Control-plane singleton listing placement policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RcsConfig {
    pub metadata: ObjectMeta,
    pub spec: RcsConfigSpec,
}

impl_resource!(RcsConfig, Kind::RcsConfig);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RcsConfigSpec {
    pub placements_namespace: String,
    pub placements: Vec<String>,
    pub default_resources: ResourceRequirements,
    pub invalid_hostname_patterns: Vec<String>,
}

impl RcsConfig {
    pub fn new(spec: RcsConfigSpec) -> Self {
        Self {
            metadata: ObjectMeta::new(names::RCS_CONFIG_NAMESPACE, names::RCS_CONFIG_NAME),
            spec,
        }
    }

    pub fn placements_namespace(&self) -> &str {
        if self.spec.placements_namespace.is_empty() {
            names::DEFAULT_PLACEMENTS_NAMESPACE
        } else {
            &self.spec.placements_namespace
        }
    }

    pub fn is_placement(&self, name: &str) -> bool {
        self.spec.placements.iter().any(|p| p == name)
    }
}

// ── Placement & decisions ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Placement {
    pub metadata: ObjectMeta,
    pub spec: PlacementSpec,
}

impl_resource!(Placement, Kind::Placement);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacementSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_clusters: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cluster_sets: Vec<String>,
}

/// Output of the external decision engine for one placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacementDecision {
    pub metadata: ObjectMeta,
    pub status: PlacementDecisionStatus,
}

impl_resource!(PlacementDecision, Kind::PlacementDecision);

impl PlacementDecision {
    /// A decision record labeled for `placement`.
    pub fn for_placement(namespace: &str, name: &str, placement: &str, clusters: &[&str]) -> Self {
        let mut metadata = ObjectMeta::new(namespace, name);
        metadata
            .labels
            .insert(names::LABEL_PLACEMENT.to_string(), placement.to_string());
        Self {
            metadata,
            status: PlacementDecisionStatus {
                decisions: clusters
                    .iter()
                    .map(|c| ClusterDecision {
                        cluster_name: c.to_string(),
                        reason: String::new(),
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacementDecisionStatus {
    pub decisions: Vec<ClusterDecision>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterDecision {
    pub cluster_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

// ── ManifestWork ───────────────────────────────────────────────────

/// The bundle shipped to a site namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestWork {
    pub metadata: ObjectMeta,
    pub spec: ManifestWorkSpec,
    pub status: ManifestWorkStatus,
}

impl_resource!(ManifestWork, Kind::ManifestWork);

impl ManifestWork {
    /// Owning Capp, from the linkage annotations.
    pub fn capp_key(&self) -> Option<ObjectKey> {
        let ann = &self.metadata.annotations;
        let name = ann.get(names::ANNOTATION_CAPP_NAME)?;
        let namespace = ann.get(names::ANNOTATION_CAPP_NAMESPACE)?;
        Some(ObjectKey::new(namespace, name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestWorkSpec {
    pub workload: ManifestsTemplate,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manifest_configs: Vec<ManifestConfigOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestsTemplate {
    pub manifests: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestConfigOption {
    pub resource_identifier: ResourceIdentifier,
    pub feedback_rules: Vec<FeedbackRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceIdentifier {
    pub group: String,
    pub resource: String,
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedbackRule {
    #[serde(rename = "type")]
    pub type_: String,
    pub json_paths: Vec<JsonPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonPath {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestWorkStatus {
    pub resource_status: ManifestResourceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestResourceStatus {
    pub manifests: Vec<ManifestCondition>,
}

/// Per-manifest status reported by the site's work agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestCondition {
    pub resource_meta: ManifestResourceMeta,
    pub status_feedbacks: StatusFeedbackResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestResourceMeta {
    pub ordinal: i32,
    pub group: String,
    pub version: String,
    pub kind: String,
    pub resource: String,
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusFeedbackResult {
    pub values: Vec<FeedbackValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackValue {
    pub name: String,
    pub field_value: FieldValue,
}

/// A typed feedback scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FieldValue {
    String { string: String },
    Integer { integer: i64 },
    Boolean { boolean: bool },
}

impl FieldValue {
    /// Render any variant as text.
    pub fn render(&self) -> String {
        match self {
            FieldValue::String { string } => string.clone(),
            FieldValue::Integer { integer } => integer.to_string(),
            FieldValue::Boolean { boolean } => boolean.to_string(),
        }
    }
}

// ── Config objects & RBAC ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigMap {
    pub metadata: ObjectMeta,
    pub data: BTreeMap<String, String>,
}

impl_resource!(ConfigMap, Kind::ConfigMap);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Secret {
    pub metadata: ObjectMeta,
    pub data: BTreeMap<String, String>,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,
}

impl_resource!(Secret, Kind::Secret);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleBinding {
    pub metadata: ObjectMeta,
    pub role_ref: RoleRef,
    pub subjects: Vec<Subject>,
}

impl_resource!(RoleBinding, Kind::RoleBinding);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleRef {
    pub api_group: String,
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subject {
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_group: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

// ── Site inventory ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub metadata: ObjectMeta,
    pub spec: NodeSpec,
    pub status: NodeStatus,
}

impl_resource!(Node, Kind::Node);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    /// Cordoned nodes do not count towards allocatable capacity.
    pub unschedulable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStatus {
    pub allocatable: BTreeMap<String, Quantity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pod {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

impl_resource!(Pod, Kind::Pod);

// ── Scores ─────────────────────────────────────────────────────────

/// Per-site fitness signal consumed by the decision engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddOnPlacementScore {
    pub metadata: ObjectMeta,
    pub status: AddOnPlacementScoreStatus,
}

impl_resource!(AddOnPlacementScore, Kind::PlacementScore);

impl AddOnPlacementScore {
    pub fn score(&self, name: &str) -> Option<i32> {
        self.status
            .scores
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddOnPlacementScoreStatus {
    pub scores: Vec<AddOnPlacementScoreItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddOnPlacementScoreItem {
    pub name: String,
    pub value: i32,
}

// ── Events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Normal => f.write_str("Normal"),
            EventType::Warning => f.write_str("Warning"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectReference {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// An observability record; written by controllers, never read back by them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub metadata: ObjectMeta,
    pub involved_object: ObjectReference,
    #[serde(rename = "type")]
    pub type_: EventType,
    pub reason: String,
    pub message: String,
    pub count: u32,
    pub first_timestamp: u64,
    pub last_timestamp: u64,
}

impl_resource!(Event, Kind::Event);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_uses_tagged_wire_format() {
        let v: FieldValue =
            serde_json::from_str(r#"{"type":"Integer","integer":3}"#).unwrap();
        assert_eq!(v, FieldValue::Integer { integer: 3 });
        assert_eq!(v.render(), "3");
        let b = FieldValue::Boolean { boolean: true };
        assert_eq!(
            serde_json::to_string(&b).unwrap(),
            r#"{"type":"Boolean","boolean":true}"#
        );
    }

    #[test]
    fn capp_reads_camel_case_documents() {
        let capp: Capp = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "app-x", "namespace": "ns1"},
            "spec": {
                "site": "pool-a",
                "routeSpec": {"tlsEnabled": true, "tlsSecret": "tls"},
                "configurationSpec": {"template": {"spec": {
                    "containers": [{"name": "c", "envFrom": [{"configMapRef": {"name": "cm"}}]}]
                }}}
            }
        }))
        .unwrap();
        assert_eq!(capp.spec.site, "pool-a");
        assert!(capp.spec.route_spec.tls_enabled);
        let container = &capp.spec.configuration_spec.template.spec.containers[0];
        assert_eq!(
            container.env_from[0].config_map_ref.as_ref().unwrap().name,
            "cm"
        );
    }

    #[test]
    fn bundle_sites_put_placement_first() {
        let mut capp = Capp::new("ns1", "app-x");
        assert!(capp.bundle_sites().is_empty());
        capp.metadata
            .annotations
            .insert(names::ANNOTATION_HAS_PLACEMENT.into(), "site-a".into());
        assert_eq!(capp.bundle_sites(), vec!["site-a"]);
        capp.status.application_links.site = "site-a".into();
        assert_eq!(capp.bundle_sites(), vec!["site-a"]);
        capp.status.application_links.site = "site-b".into();
        assert_eq!(capp.bundle_sites(), vec!["site-a", "site-b"]);
    }

    #[test]
    fn finalizer_helpers_are_idempotent() {
        let mut meta = ObjectMeta::new("ns", "n");
        assert!(meta.add_finalizer("f"));
        assert!(!meta.add_finalizer("f"));
        assert!(meta.remove_finalizer("f"));
        assert!(!meta.remove_finalizer("f"));
    }

    #[test]
    fn set_condition_reports_changes() {
        let mut conditions = Vec::new();
        let cond = Condition::new("VolumesAvailable", false, "VolumeNotFound", "missing");
        assert!(set_condition(&mut conditions, cond.clone(), 10));
        assert!(!set_condition(&mut conditions, cond, 20));
        assert_eq!(conditions[0].last_transition_time, 10);

        let ok = Condition::new("VolumesAvailable", true, "VolumesFound", "");
        assert!(set_condition(&mut conditions, ok, 30));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, "True");
        assert_eq!(conditions[0].last_transition_time, 30);
    }

    #[test]
    fn rcs_config_defaults_placements_namespace() {
        let config = RcsConfig::new(RcsConfigSpec::default());
        assert_eq!(config.placements_namespace(), "default");
        assert_eq!(config.metadata.name, "rcs-config");
    }

    #[test]
    fn manifest_work_links_back_to_capp() {
        let mut mw = ManifestWork::default();
        assert!(mw.capp_key().is_none());
        mw.metadata
            .annotations
            .insert(names::ANNOTATION_CAPP_NAME.into(), "app-x".into());
        mw.metadata
            .annotations
            .insert(names::ANNOTATION_CAPP_NAMESPACE.into(), "ns1".into());
        assert_eq!(mw.capp_key(), Some(ObjectKey::new("ns1", "app-x")));
    }
}
