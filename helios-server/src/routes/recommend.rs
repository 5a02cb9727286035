//! `POST /recommend`.

use axum::{extract::State, Json};
use helios_core::wire::{RecommendRequest, RecommendResponse};

use crate::{errors::AppError, state::AppState};

const MIN_TARGET_UTILIZATION: f64 = 0.1;
const MAX_TARGET_UTILIZATION: f64 = 0.95;

pub async fn recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    if !(MIN_TARGET_UTILIZATION..=MAX_TARGET_UTILIZATION).contains(&req.target_utilization) {
        return Err(AppError::Validation(format!(
            "target_utilization must be between {MIN_TARGET_UTILIZATION} and {MAX_TARGET_UTILIZATION}, got {}",
            req.target_utilization
        )));
    }
    let response = state.recommender.recommend(&req);
    let action_label = format!("{:?}", response.action);
    state.metrics.recommend_requests.with_label_values(&[&action_label]).inc();
    Ok(Json(response))
}
