//! `POST /api/v1/ingest`.

use axum::{extract::State, Json};
use helios_core::wire::{IngestRequest, IngestResponse};

use crate::{errors::AppError, state::AppState};

pub async fn ingest(State(state): State<AppState>, Json(req): Json<IngestRequest>) -> Result<Json<IngestResponse>, AppError> {
    let sample_count = req.metrics.len();
    match crate::ingest::ingest(state.store.as_ref(), req).await {
        Ok(response) => {
            state.metrics.ingest_requests.with_label_values(&["ok"]).inc();
            state.metrics.ingest_samples.with_label_values(&["ok"]).inc_by(response.received as u64);
            Ok(Json(response))
        }
        Err(e) => {
            state.metrics.ingest_requests.with_label_values(&["error"]).inc();
            state.metrics.ingest_samples.with_label_values(&["error"]).inc_by(sample_count as u64);
            Err(AppError::from(e))
        }
    }
}
