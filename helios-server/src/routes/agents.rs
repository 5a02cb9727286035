//! Agent registry lookup, heartbeat, and control-config endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use helios_core::{
    model::Agent,
    wire::{AgentConfigResponse, HeartbeatRequest, UpdateAgentConfigRequest},
};

use crate::{errors::AppError, state::AppState};

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Agent>, AppError> {
    state
        .store
        .get_agent(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("agent '{id}' not found")))
}

pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<HeartbeatRequest>,
) -> Result<Json<Agent>, AppError> {
    state
        .store
        .heartbeat_agent(&id, req)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("agent '{id}' not found")))
}

const MIN_COLLECTION_INTERVAL: u32 = 5;
const MAX_COLLECTION_INTERVAL: u32 = 3600;

pub async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAgentConfigRequest>,
) -> Result<Json<AgentConfigResponse>, AppError> {
    if let Some(interval) = req.collection_interval {
        if !(MIN_COLLECTION_INTERVAL..=MAX_COLLECTION_INTERVAL).contains(&interval) {
            return Err(AppError::Validation(format!(
                "collection_interval must be between {MIN_COLLECTION_INTERVAL} and {MAX_COLLECTION_INTERVAL}, got {interval}"
            )));
        }
    }
    let agent = state
        .store
        .update_agent_config(&id, req)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("agent '{id}' not found")))?;
    Ok(Json(AgentConfigResponse { paused: agent.paused, collection_interval: agent.collection_interval }))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, AppError> {
    if state.store.delete_agent(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("agent '{id}' not found")))
    }
}
