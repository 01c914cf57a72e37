//! rcs-api — REST API for the RCS control plane.
//!
//! Exposes the object store over HTTP so operators can submit Capps,
//! seed policies, decisions and site inventory, and watch the controllers
//! work through bundles, scores and events.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness |
//! | GET | `/readyz` | Store readable |
//! | GET | `/api/v1/capps` | List Capps (`?namespace=`) |
//! | POST | `/api/v1/capps` | Create a Capp |
//! | GET | `/api/v1/capps/{namespace}/{name}` | Get a Capp |
//! | DELETE | `/api/v1/capps/{namespace}/{name}` | Request deletion |
//! | GET, PUT | `/api/v1/rcsconfig` | Read or replace the RCSConfig singleton |
//! | GET | `/api/v1/manifestworks` | List bundles |
//! | GET | `/api/v1/manifestworks/{namespace}/{name}` | Get a bundle |
//! | GET | `/api/v1/scores` | List site scores |
//! | GET | `/api/v1/events` | List events |
//! | GET, POST | `/api/v1/placements` | Placement policies |
//! | GET, POST | `/api/v1/placementdecisions` | Decision records |
//! | POST | `/api/v1/{configmaps,secrets,rolebindings,nodes,pods}` | Seed inputs |

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use rcs_state::{
    AddOnPlacementScore, Capp, ConfigMap, Event, ManifestWork, Node, Placement, PlacementDecision,
    Pod, RoleBinding, Secret, StateStore,
};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
}

/// Build the complete router: probes plus the `/api/v1` routes.
pub fn build_router(store: StateStore) -> Router {
    let api_state = ApiState { store };

    let api_routes = Router::new()
        .route(
            "/capps",
            get(handlers::list::<Capp>).post(handlers::create_capp),
        )
        .route(
            "/capps/{namespace}/{name}",
            get(handlers::get::<Capp>).delete(handlers::delete_capp),
        )
        .route(
            "/rcsconfig",
            get(handlers::get_rcs_config).put(handlers::put_rcs_config),
        )
        .route("/manifestworks", get(handlers::list::<ManifestWork>))
        .route(
            "/manifestworks/{namespace}/{name}",
            get(handlers::get::<ManifestWork>),
        )
        .route("/scores", get(handlers::list::<AddOnPlacementScore>))
        .route("/events", get(handlers::list::<Event>))
        .route(
            "/placements",
            get(handlers::list::<Placement>).post(handlers::apply::<Placement>),
        )
        .route(
            "/placementdecisions",
            get(handlers::list::<PlacementDecision>).post(handlers::apply::<PlacementDecision>),
        )
        .route("/configmaps", post(handlers::apply::<ConfigMap>))
        .route("/secrets", post(handlers::apply::<Secret>))
        .route("/rolebindings", post(handlers::apply::<RoleBinding>))
        .route("/nodes", post(handlers::apply::<Node>))
        .route("/pods", post(handlers::apply::<Pod>))
        .with_state(api_state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz).with_state(api_state))
}
