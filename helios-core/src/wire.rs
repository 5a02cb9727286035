//! Wire types for the agent↔server ingest channel and the server's REST surface.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Agent, Environment, MetricSample, ModelInfo};

// ---- Agent -> server ingest -------------------------------------------------

/// Body of `POST /api/v1/ingest`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IngestRequest {
    pub metrics: Vec<MetricSample>,
    pub agent_version: String,
    pub sent_at: DateTime<Utc>,
}

/// Server-driven reconfiguration, echoed on every ingest response. Absent fields
/// mean "no change"; this is the sole agent↔server control channel.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Commands {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_interval: Option<u32>,
}

impl Commands {
    /// Whether this command set carries no instructions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paused.is_none() && self.collection_interval.is_none()
    }
}

/// Response to `POST /api/v1/ingest`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IngestResponse {
    pub received: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Commands>,
}

// ---- Health / readiness ------------------------------------------------------

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub models_loaded: usize,
    pub uptime_seconds: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReadyDetails {
    pub baseline: bool,
    pub prophet: bool,
    pub xgboost: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub models_ready: bool,
    pub details: ReadyDetails,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

// ---- Prediction ---------------------------------------------------------------

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PredictRequest {
    pub metric: String,
    pub periods: u32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub include_confidence: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PredictBatchRequest {
    pub metrics: Vec<String>,
    pub periods: u32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub include_confidence: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PredictionPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PredictMetadata {
    pub cache_hit: bool,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PredictResponse {
    pub metric: String,
    pub model: String,
    pub predictions: Vec<PredictionPoint>,
    pub metadata: PredictMetadata,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PredictBatchResponse {
    pub results: Vec<PredictResponse>,
}

// ---- Anomaly detection ----------------------------------------------------

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DetectRequest {
    pub metrics: BTreeMap<String, Vec<DataPoint>>,
    #[serde(default = "default_threshold_sigma")]
    pub threshold_sigma: f64,
}

fn default_threshold_sigma() -> f64 {
    2.5
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Anomaly {
    pub metric: String,
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub score: f64,
    pub expected: f64,
    pub severity: Severity,
    pub description: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DetectSummary {
    pub status: String,
    pub anomaly_rate: f64,
    pub by_severity: BTreeMap<String, usize>,
    pub by_metric: BTreeMap<String, usize>,
    pub max_score: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DetectResponse {
    pub anomalies: Vec<Anomaly>,
    pub summary: DetectSummary,
}

// ---- Recommendation --------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct WorkloadState {
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub cpu_request: Option<String>,
    #[serde(default)]
    pub cpu_limit: Option<String>,
    #[serde(default)]
    pub memory_request: Option<String>,
    #[serde(default)]
    pub memory_limit: Option<String>,
}

fn default_replicas() -> u32 {
    1
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecommendRequest {
    pub workload: String,
    pub namespace: String,
    #[serde(default)]
    pub current_state: WorkloadState,
    #[serde(default)]
    pub predictions: Option<Vec<f64>>,
    #[serde(default = "default_target_utilization")]
    pub target_utilization: f64,
}

fn default_target_utilization() -> f64 {
    0.7
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendAction {
    NoAction,
    ScaleOut,
    ScaleIn,
    /// Vertical right-size recommendation, emitted alongside a horizontal action
    /// when CPU limit exceeds 3x CPU request.
    RightSize,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecommendMetadata {
    pub cooldown_active: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecommendResponse {
    pub action: RecommendAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_replicas: Option<u32>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings_percent: Option<f64>,
    pub reason: String,
    pub metadata: RecommendMetadata,
    /// Present only when a secondary vertical right-size action is also warranted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_action: Option<Box<RecommendResponse>>,
}

// ---- Deployment / agent registry API ---------------------------------------

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateDeploymentRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UpdateDeploymentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub environment: Option<Environment>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RegisterAgentRequest {
    #[serde(default)]
    pub agent_id: Option<String>,
    pub hostname: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub agent_version: String,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub metrics: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UpdateAgentConfigRequest {
    #[serde(default)]
    pub paused: Option<bool>,
    #[serde(default)]
    pub collection_interval: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AgentConfigResponse {
    pub paused: bool,
    pub collection_interval: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MetricNamesResponse {
    pub metrics: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MetricQueryResponse {
    pub metric: String,
    pub data: Vec<MetricPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<MetricPoint>,
    pub count: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeploymentAgentsResponse {
    pub agents: Vec<Agent>,
}
