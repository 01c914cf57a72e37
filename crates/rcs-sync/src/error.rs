//! Sync error types.

use rcs_core::names;
use rcs_state::StateError;
use thiserror::Error;

/// Errors that fail a bundle sync reconcile.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unable to fetch ConfigMap from Capp spec: {0}")]
    ConfigMapFetch(StateError),

    #[error("unable to fetch Secret from Capp spec: {0}")]
    SecretFetch(StateError),

    #[error("failed to list RoleBindings in namespace {namespace}: {source}")]
    RoleBindings {
        namespace: String,
        #[source]
        source: StateError,
    },

    #[error("failed to encode manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to create ManifestWork {namespace}/{name}: {source}")]
    BundleCreate {
        namespace: String,
        name: String,
        #[source]
        source: StateError,
    },

    #[error("failed to sync ManifestWork {namespace}/{name}: {source}")]
    BundleUpdate {
        namespace: String,
        name: String,
        #[source]
        source: StateError,
    },

    #[error("failed to delete ManifestWork {namespace}/{name}: {source}")]
    BundleDelete {
        namespace: String,
        name: String,
        #[source]
        source: StateError,
    },

    #[error("state store error: {0}")]
    State(#[from] StateError),
}

impl SyncError {
    /// A referenced ConfigMap or Secret could not be read.
    pub fn is_volume_error(&self) -> bool {
        matches!(self, SyncError::ConfigMapFetch(_) | SyncError::SecretFetch(_))
    }

    /// Event reason reported on the Capp when assembly fails with this error.
    pub fn assembly_reason(&self) -> Option<&'static str> {
        match self {
            SyncError::ConfigMapFetch(_) | SyncError::SecretFetch(_) => {
                Some(names::REASON_VOLUME_NOT_FOUND)
            }
            SyncError::RoleBindings { .. } => Some(names::REASON_AUTH_FAILED),
            _ => None,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
