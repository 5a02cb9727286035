//! `GET /health` and `GET /ready`.

use axum::extract::State;
use axum::Json;
use helios_core::wire::{HealthResponse, ReadyDetails, ReadyResponse};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        models_loaded: state.models.model_count(),
        uptime_seconds: state.uptime_seconds(),
    })
}

pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let details = ReadyDetails {
        baseline: state.models.forecaster("baseline").is_ok(),
        prophet: state.models.forecaster("prophet").is_ok(),
        xgboost: state.models.xgboost().is_some(),
    };
    let models_ready = state.models.is_loaded();
    Json(ReadyResponse {
        ready: models_ready,
        models_ready,
        details,
    })
}
