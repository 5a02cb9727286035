//! `POST /detect`.

use axum::{extract::State, Json};
use helios_core::wire::{DetectRequest, DetectResponse};

use crate::{errors::AppError, state::AppState};

const MIN_THRESHOLD_SIGMA: f64 = 1.0;
const MAX_THRESHOLD_SIGMA: f64 = 5.0;

pub async fn detect(State(state): State<AppState>, Json(req): Json<DetectRequest>) -> Result<Json<DetectResponse>, AppError> {
    if !(MIN_THRESHOLD_SIGMA..=MAX_THRESHOLD_SIGMA).contains(&req.threshold_sigma) {
        return Err(AppError::Validation(format!(
            "threshold_sigma must be between {MIN_THRESHOLD_SIGMA} and {MAX_THRESHOLD_SIGMA}, got {}",
            req.threshold_sigma
        )));
    }
    let response = state.anomaly.detect(&req);
    state.metrics.detect_requests.with_label_values(&[&response.summary.status]).inc();
    Ok(Json(response))
}
