//! REST API handlers.
//!
//! Every handler goes straight to the `StateStore`; controllers pick the
//! writes up through their informers like any other change.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rcs_core::names;
use rcs_state::{Capp, RcsConfig, Resource, StateError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

fn state_error(e: &StateError) -> Response {
    let status = match e {
        StateError::NotFound { .. } => StatusCode::NOT_FOUND,
        StateError::AlreadyExists { .. } | StateError::Conflict { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(&e.to_string(), status)
}

/// Optional `?namespace=` filter on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct NamespaceFilter {
    pub namespace: Option<String>,
}

// ── Probes ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// GET /readyz
///
/// Ready once the store answers reads.
pub async fn readyz(State(state): State<ApiState>) -> Response {
    match state.store.get::<RcsConfig>(names::RCS_CONFIG_NAMESPACE, names::RCS_CONFIG_NAME) {
        Ok(_) => (StatusCode::OK, "ready").into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE),
    }
}

// ── Generic reads and writes ───────────────────────────────────

/// GET list of any stored kind.
pub async fn list<T: Resource>(
    State(state): State<ApiState>,
    Query(filter): Query<NamespaceFilter>,
) -> Response {
    match state.store.list::<T>(filter.namespace.as_deref()) {
        Ok(objects) => ApiResponse::ok(objects).into_response(),
        Err(e) => state_error(&e),
    }
}

/// GET one object by namespace and name.
pub async fn get<T: Resource>(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Response {
    match state.store.fetch::<T>(&namespace, &name) {
        Ok(obj) => ApiResponse::ok(obj).into_response(),
        Err(e) => state_error(&e),
    }
}

/// POST create-or-overwrite of an input record (policies, decisions,
/// config objects, site inventory).
pub async fn apply<T: Resource>(State(state): State<ApiState>, Json(obj): Json<T>) -> Response {
    match state.store.apply(&obj) {
        Ok(stored) => {
            debug!(kind = %T::KIND, key = %stored.key(), "object applied via API");
            ApiResponse::ok(stored).into_response()
        }
        Err(e) => state_error(&e),
    }
}

// ── Capps ──────────────────────────────────────────────────────

/// POST /api/v1/capps
///
/// Status, finalizers and the placement annotation are controller-owned
/// and dropped from the body.
pub async fn create_capp(State(state): State<ApiState>, Json(mut capp): Json<Capp>) -> Response {
    if capp.metadata.name.is_empty() || capp.metadata.namespace.is_empty() {
        return error_response("metadata.name and metadata.namespace are required", StatusCode::BAD_REQUEST);
    }
    capp.status = Default::default();
    capp.metadata.annotations.remove(names::ANNOTATION_HAS_PLACEMENT);
    capp.metadata.finalizers.clear();
    capp.metadata.deletion_timestamp = None;

    match state.store.create(&capp) {
        Ok(stored) => {
            info!(capp = %stored.key(), "capp created via API");
            (StatusCode::CREATED, ApiResponse::ok(stored)).into_response()
        }
        Err(e) => state_error(&e),
    }
}

/// DELETE /api/v1/capps/{namespace}/{name}
///
/// `202 Accepted` while the cleanup finalizer holds the record.
pub async fn delete_capp(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Response {
    match state.store.delete::<Capp>(&namespace, &name) {
        Ok(true) => ApiResponse::ok("deleted").into_response(),
        Ok(false) => (StatusCode::ACCEPTED, ApiResponse::ok("deleting")).into_response(),
        Err(e) => state_error(&e),
    }
}

// ── RCSConfig ──────────────────────────────────────────────────

/// GET /api/v1/rcsconfig
pub async fn get_rcs_config(State(state): State<ApiState>) -> Response {
    match state
        .store
        .fetch::<RcsConfig>(names::RCS_CONFIG_NAMESPACE, names::RCS_CONFIG_NAME)
    {
        Ok(config) => ApiResponse::ok(config).into_response(),
        Err(e) => state_error(&e),
    }
}

/// PUT /api/v1/rcsconfig
///
/// The body's name and namespace are ignored; the singleton identity is fixed.
pub async fn put_rcs_config(
    State(state): State<ApiState>,
    Json(mut config): Json<RcsConfig>,
) -> Response {
    config.metadata.name = names::RCS_CONFIG_NAME.to_string();
    config.metadata.namespace = names::RCS_CONFIG_NAMESPACE.to_string();
    match state.store.apply(&config) {
        Ok(stored) => {
            info!(placements = ?stored.spec.placements, "rcsconfig replaced via API");
            ApiResponse::ok(stored).into_response()
        }
        Err(e) => state_error(&e),
    }
}
