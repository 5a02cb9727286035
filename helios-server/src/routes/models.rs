//! `GET /models`.

use axum::{extract::State, Json};
use helios_core::wire::ModelsResponse;

use crate::{errors::AppError, state::AppState};

pub async fn list(State(state): State<AppState>) -> Result<Json<ModelsResponse>, AppError> {
    if !state.models.is_loaded() {
        return Err(AppError::NotReady);
    }
    Ok(Json(ModelsResponse { models: state.models.list_models() }))
}
