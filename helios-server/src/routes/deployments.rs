//! Deployment registry CRUD, plus the per-deployment agents/metrics views.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use helios_core::{
    id,
    wire::{
        CreateDeploymentRequest, DeploymentAgentsResponse, MetricNamesResponse,
        RegisterAgentRequest, UpdateDeploymentRequest,
    },
};

pub use helios_core::model::{Agent, Deployment};

use crate::{errors::AppError, state::AppState};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Deployment>>, AppError> {
    Ok(Json(state.store.list_deployments().await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateDeploymentRequest>,
) -> Result<Json<Deployment>, AppError> {
    if !id::is_valid_deployment_name(&req.name) {
        return Err(AppError::Validation(format!("'{}' is not a valid deployment name", req.name)));
    }
    Ok(Json(state.store.create_deployment(req).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Deployment>, AppError> {
    state
        .store
        .get_deployment(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("deployment '{id}' not found")))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDeploymentRequest>,
) -> Result<Json<Deployment>, AppError> {
    state
        .store
        .update_deployment(&id, req)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("deployment '{id}' not found")))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, AppError> {
    if state.store.delete_deployment(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("deployment '{id}' not found")))
    }
}

pub async fn metrics(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<MetricNamesResponse>, AppError> {
    Ok(Json(MetricNamesResponse { metrics: state.store.get_deployment_metric_names(&id).await? }))
}

pub async fn agents(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<DeploymentAgentsResponse>, AppError> {
    Ok(Json(DeploymentAgentsResponse { agents: state.store.list_agents(Some(&id)).await? }))
}

pub async fn register_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RegisterAgentRequest>,
) -> Result<Json<Agent>, AppError> {
    Ok(Json(state.store.register_agent(&id, req).await?))
}
