//! Time-series read API: `GET /api/metrics`, `/api/metrics/{name}`,
//! `/api/metrics/{name}/latest`.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use helios_core::wire::{MetricNamesResponse, MetricQueryResponse, MetricPoint};
use serde::Deserialize;

use crate::{errors::AppError, state::AppState};

#[derive(Deserialize)]
pub struct DeploymentFilter {
    deployment: Option<String>,
}

#[derive(Deserialize)]
pub struct MetricQuery {
    deployment: Option<String>,
    #[serde(default = "default_hours")]
    hours: i64,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_hours() -> i64 {
    24
}

fn default_limit() -> usize {
    1000
}

pub async fn names(
    State(state): State<AppState>,
    Query(filter): Query<DeploymentFilter>,
) -> Result<Json<MetricNamesResponse>, AppError> {
    Ok(Json(MetricNamesResponse { metrics: state.store.get_metric_names(filter.deployment.as_deref()).await? }))
}

pub async fn query(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<MetricQuery>,
) -> Result<Json<MetricQueryResponse>, AppError> {
    let data: Vec<MetricPoint> = state.store.get_metrics(&name, q.deployment.as_deref(), q.hours, q.limit).await?;
    let latest = data.last().cloned();
    Ok(Json(MetricQueryResponse { metric: name, count: data.len(), data, latest }))
}

pub async fn latest(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(filter): Query<DeploymentFilter>,
) -> Result<Json<MetricPoint>, AppError> {
    state
        .store
        .get_latest(&name, filter.deployment.as_deref())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no data for metric '{name}'")))
}
