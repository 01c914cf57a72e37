//! Well-known names shared by the hub controllers and site agents.

/// API group of the Capp and RCSConfig kinds.
pub const GROUP: &str = "rcs.dana.io";

/// Served version of [`GROUP`].
pub const VERSION: &str = "v1alpha1";

/// `apiVersion` written into synthesized Capp manifests.
pub const CAPP_API_VERSION: &str = "rcs.dana.io/v1alpha1";

pub const CAPP_KIND: &str = "Capp";

/// Plural resource name used in feedback rule identifiers.
pub const CAPP_RESOURCE: &str = "capps";

// ── Annotations & labels ───────────────────────────────────────────

/// Mirrors `status.applicationLinks.site`; gates the placement predicate.
pub const ANNOTATION_HAS_PLACEMENT: &str = "rcs.dana.io/has-placement";

/// Linkage from a ManifestWork back to its Capp.
pub const ANNOTATION_CAPP_NAME: &str = "rcs.dana.io/capp-name";
pub const ANNOTATION_CAPP_NAMESPACE: &str = "rcs.dana.io/capp-namespace";

pub const LABEL_MANAGED_BY: &str = "rcs.dana.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "rcs";

/// Label the decision engine puts on PlacementDecisions.
pub const LABEL_PLACEMENT: &str = "cluster.open-cluster-management.io/placement";

// ── Finalizer ──────────────────────────────────────────────────────

pub const FINALIZER_CAPP_CLEANUP: &str = "rcs.dana.io/capp-cleanup";

// ── Singletons ─────────────────────────────────────────────────────

pub const RCS_CONFIG_NAME: &str = "rcs-config";
pub const RCS_CONFIG_NAMESPACE: &str = "rcs-deployer-system";

/// Used when RCSConfig leaves `placementsNamespace` empty.
pub const DEFAULT_PLACEMENTS_NAMESPACE: &str = "default";

/// The hub's own cluster; never a valid workload target.
pub const LOCAL_CLUSTER: &str = "local-cluster";

pub const MANIFEST_WORK_PREFIX: &str = "mw-create-";

pub const PLACEMENT_SCORE_NAME: &str = "resource-usage-score";
pub const SCORE_CPU_AVAILABLE: &str = "cpuAvailable";
pub const SCORE_MEM_AVAILABLE: &str = "memAvailable";

// ── RBAC ───────────────────────────────────────────────────────────

pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Role names whose subjects get log access on the remote site.
pub const LOG_READER_SOURCE_ROLES: [&str; 2] = ["admin", "logs-reader"];

pub const LOGS_READER_SUFFIX: &str = "-logs-reader";

// ── Conditions ─────────────────────────────────────────────────────

pub const CONDITION_VOLUMES_AVAILABLE: &str = "VolumesAvailable";

// ── Status feedback ────────────────────────────────────────────────

/// Feedback rule type understood by the work agent.
pub const FEEDBACK_RULE_JSON_PATHS: &str = "JSONPaths";

pub const FEEDBACK_SITE: &str = "site";
pub const FEEDBACK_CONSOLE_LINK: &str = "consoleLink";
pub const FEEDBACK_CLUSTER_SEGMENT: &str = "clusterSegment";
pub const FEEDBACK_URL: &str = "url";
pub const FEEDBACK_LATEST_CREATED_REVISION: &str = "latestCreatedRevisionName";
pub const FEEDBACK_LATEST_READY_REVISION: &str = "latestReadyRevisionName";
pub const FEEDBACK_OBSERVED_GENERATION: &str = "observedGeneration";

/// Prefix of the per-index traffic feedback values, `traffic[<i>].<field>`.
pub const FEEDBACK_TRAFFIC: &str = "traffic";

/// `(feedback name, JSON path)` pairs attached to every Capp bundle.
///
/// `[*]` paths fan out into one value per element, named with the element
/// index in place of the star.
pub const CAPP_FEEDBACK_PATHS: [(&str, &str); 10] = [
    (FEEDBACK_SITE, ".status.applicationLinks.site"),
    (FEEDBACK_CONSOLE_LINK, ".status.applicationLinks.consoleLink"),
    (FEEDBACK_CLUSTER_SEGMENT, ".status.applicationLinks.clusterSegment"),
    (FEEDBACK_URL, ".status.knativeObjectStatus.address.url"),
    (
        FEEDBACK_LATEST_CREATED_REVISION,
        ".status.knativeObjectStatus.latestCreatedRevisionName",
    ),
    (
        FEEDBACK_LATEST_READY_REVISION,
        ".status.knativeObjectStatus.latestReadyRevisionName",
    ),
    (
        FEEDBACK_OBSERVED_GENERATION,
        ".status.knativeObjectStatus.observedGeneration",
    ),
    (
        "traffic[*].percent",
        ".status.knativeObjectStatus.traffic[*].percent",
    ),
    (
        "traffic[*].revisionName",
        ".status.knativeObjectStatus.traffic[*].revisionName",
    ),
    (
        "traffic[*].latestRevision",
        ".status.knativeObjectStatus.traffic[*].latestRevision",
    ),
];

// ── Event reasons ──────────────────────────────────────────────────

pub const REASON_CAPP_SCHEDULED: &str = "CappScheduled";
pub const REASON_DECISION_NOT_SATISFIED: &str = "PlacementDecisionNotSatisfied";
pub const REASON_VOLUME_NOT_FOUND: &str = "VolumeNotFound";
pub const REASON_AUTH_FAILED: &str = "AuthManifestsCreationFailed";
pub const REASON_MANIFEST_WORK_CREATED: &str = "ManifestWorkCreated";
pub const REASON_MANIFEST_WORK_FAILED: &str = "ManifestWorkCreationFailed";
pub const REASON_RCS_CONFIG_NOT_FOUND: &str = "RCSConfigNotFound";
pub const REASON_NO_PLACEMENTS: &str = "NoPlacementsConfigured";
pub const REASON_PLACEMENT_NOT_FOUND: &str = "PlacementNotFound";

/// Deterministic bundle name for a Capp.
pub fn manifest_work_name(capp_namespace: &str, capp_name: &str) -> String {
    format!("{MANIFEST_WORK_PREFIX}{capp_namespace}-{capp_name}")
}

/// Name of the generated Role and RoleBinding for a Capp.
pub fn logs_reader_name(capp_name: &str) -> String {
    format!("{capp_name}{LOGS_READER_SUFFIX}")
}
