//! `POST /predict` and `POST /predict/batch`.

use axum::{extract::State, Json};
use helios_core::wire::{PredictBatchRequest, PredictBatchResponse, PredictRequest, PredictResponse};

use crate::{errors::AppError, state::AppState};

const MIN_PERIODS: u32 = 1;
const MAX_PERIODS: u32 = 288;

fn validate_periods(periods: u32) -> Result<(), AppError> {
    if (MIN_PERIODS..=MAX_PERIODS).contains(&periods) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "periods must be between {MIN_PERIODS} and {MAX_PERIODS}, got {periods}"
        )))
    }
}

pub async fn predict(State(state): State<AppState>, Json(req): Json<PredictRequest>) -> Result<Json<PredictResponse>, AppError> {
    validate_periods(req.periods)?;
    let response = state.predictor.predict(&req)?;
    let cache_label = if response.metadata.cache_hit { "hit" } else { "miss" };
    state.metrics.predict_requests.with_label_values(&[&response.model, cache_label]).inc();
    Ok(Json(response))
}

pub async fn predict_batch(
    State(state): State<AppState>,
    Json(req): Json<PredictBatchRequest>,
) -> Result<Json<PredictBatchResponse>, AppError> {
    validate_periods(req.periods)?;
    let mut results = Vec::with_capacity(req.metrics.len());
    for metric in &req.metrics {
        let single = PredictRequest {
            metric: metric.clone(),
            periods: req.periods,
            model: req.model.clone(),
            include_confidence: req.include_confidence,
        };
        let response = state.predictor.predict(&single)?;
        let cache_label = if response.metadata.cache_hit { "hit" } else { "miss" };
        state.metrics.predict_requests.with_label_values(&[&response.model, cache_label]).inc();
        results.push(response);
    }
    Ok(Json(PredictBatchResponse { results }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_periods_are_accepted() {
        assert!(validate_periods(1).is_ok());
        assert!(validate_periods(288).is_ok());
    }

    #[test]
    fn out_of_range_periods_are_rejected() {
        assert!(validate_periods(0).is_err());
        assert!(validate_periods(289).is_err());
    }
}
