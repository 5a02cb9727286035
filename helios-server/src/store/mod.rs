//! Deployment/agent registry and metrics store.
//!
//! One `Store` trait, two implementations (§4.3): [`sqlite::SqliteStore`]
//! (preferred, persistent, WAL-enabled) and [`memory::MemoryStore`] (used
//! only when the embedded backend cannot be opened). Callers hold a
//! `Box<dyn Store>` and are oblivious to which backend is live.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use helios_core::{model::MetricSample, wire::MetricPoint};
use thiserror::Error;

pub use helios_core::model::{Agent, AgentStatus, Deployment};
use helios_core::wire::{
    CreateDeploymentRequest, HeartbeatRequest, RegisterAgentRequest, UpdateAgentConfigRequest,
    UpdateDeploymentRequest,
};

/// Error surfaced by either store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a deployment named '{0}' already exists")]
    DuplicateName(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("unable to open database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("background task panicked: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Agent control settings as polled back via `get_agent_config`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentConfig {
    pub paused: bool,
    pub collection_interval: u32,
}

/// Combined deployment/agent registry and time-series metrics store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_deployments(&self) -> Result<Vec<Deployment>, StoreError>;
    async fn get_deployment(&self, id: &str) -> Result<Option<Deployment>, StoreError>;
    async fn create_deployment(&self, req: CreateDeploymentRequest) -> Result<Deployment, StoreError>;
    async fn update_deployment(
        &self,
        id: &str,
        req: UpdateDeploymentRequest,
    ) -> Result<Option<Deployment>, StoreError>;
    async fn delete_deployment(&self, id: &str) -> Result<bool, StoreError>;

    async fn list_agents(&self, deployment_id: Option<&str>) -> Result<Vec<Agent>, StoreError>;
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, StoreError>;
    async fn register_agent(
        &self,
        deployment_id: &str,
        req: RegisterAgentRequest,
    ) -> Result<Agent, StoreError>;
    async fn heartbeat_agent(&self, id: &str, req: HeartbeatRequest) -> Result<Option<Agent>, StoreError>;
    async fn update_agent_config(
        &self,
        id: &str,
        req: UpdateAgentConfigRequest,
    ) -> Result<Option<Agent>, StoreError>;
    async fn get_agent_config(&self, id: &str) -> Result<Option<AgentConfig>, StoreError>;
    async fn delete_agent(&self, id: &str) -> Result<bool, StoreError>;
    async fn get_deployment_metric_names(&self, deployment_id: &str) -> Result<Vec<String>, StoreError>;

    async fn add_metrics(&self, samples: &[MetricSample]) -> Result<usize, StoreError>;
    async fn get_metrics(
        &self,
        name: &str,
        deployment: Option<&str>,
        hours: i64,
        limit: usize,
    ) -> Result<Vec<MetricPoint>, StoreError>;
    async fn get_latest(&self, name: &str, deployment: Option<&str>) -> Result<Option<MetricPoint>, StoreError>;
    async fn get_metric_names(&self, deployment: Option<&str>) -> Result<Vec<String>, StoreError>;
}
