//! REST surface: route table assembly plus one handler module per resource.
//!
//! `original_source`'s `ml/inference/app.py` is a route-free stub, so there
//! is no FastAPI router split to port from; the endpoint surface itself
//! comes straight from spec.md §6.2. One handler module per resource here
//! mirrors the way the teacher's `uxum` services build their own route
//! trees, assembled into a single [`axum::Router`].

pub mod agents;
pub mod deployments;
pub mod detect;
pub mod health;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod predict;
pub mod recommend;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Build the full route table for a given [`AppState`]. Auth, CORS, and
/// tracing middleware are layered on by the binary, not here, so this is
/// reusable from integration tests without standing up a full server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(crate::metrics::handler))
        .route("/api/v1/ingest", post(ingest::ingest))
        .route("/models", get(models::list))
        .route("/predict", post(predict::predict))
        .route("/predict/batch", post(predict::predict_batch))
        .route("/detect", post(detect::detect))
        .route("/recommend", post(recommend::recommend))
        .route("/api/deployments", get(deployments::list).post(deployments::create))
        .route(
            "/api/deployments/{id}",
            get(deployments::get).patch(deployments::update).delete(deployments::delete),
        )
        .route("/api/deployments/{id}/metrics", get(deployments::metrics))
        .route("/api/deployments/{id}/agents", get(deployments::agents))
        .route("/api/deployments/{id}/agents/register", post(deployments::register_agent))
        .route(
            "/api/agents/{id}",
            get(agents::get).patch(agents::update_config).delete(agents::delete),
        )
        .route("/api/agents/{id}/heartbeat", post(agents::heartbeat))
        .route("/api/metrics", get(metrics::names))
        .route("/api/metrics/{name}", get(metrics::query))
        .route("/api/metrics/{name}/latest", get(metrics::latest))
        .with_state(state)
}
