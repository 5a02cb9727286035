//! Core entities shared between the agent and the server.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a metric observation.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Point-in-time value, e.g. current utilization.
    #[default]
    Gauge,
    /// Monotonically increasing value, e.g. bytes sent.
    Counter,
    /// Distribution of observed values.
    Histogram,
    /// Pre-aggregated distribution (quantiles, sum, count).
    Summary,
}

/// One metric observation produced by a [`Source`](crate::model::SourceConfig).
///
/// Immutable after creation: owned by the agent buffer until flushed, then
/// copied verbatim into the server's metrics store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MetricSample {
    /// Metric name, e.g. `cpu_utilization`.
    pub name: String,
    /// Observed value.
    pub value: f64,
    /// UTC observation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Metric kind.
    #[serde(rename = "type", default)]
    pub kind: MetricType,
    /// Arbitrary key/value labels, including the routing tag `deployment`.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Name of the source that produced this sample.
    #[serde(default)]
    pub source: String,
}

impl MetricSample {
    /// Build a sample with the current labels plus `extra` merged in, `extra` taking
    /// precedence on key collisions.
    #[must_use]
    pub fn with_labels_merged(mut self, extra: &BTreeMap<String, String>) -> Self {
        for (k, v) in extra {
            self.labels.insert(k.clone(), v.clone());
        }
        self
    }
}

/// Declarative configuration for a single source instance.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SourceConfig {
    /// Operator-assigned name for this source instance.
    pub name: String,
    /// Registry key, e.g. `system`, `prometheus`, `datadog`.
    #[serde(rename = "type")]
    pub source_type: String,
    /// Whether this source should be polled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Poll interval, in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Backend base URL, when applicable.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Single API key credential, when the backend only needs one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Named credentials, e.g. `tenant_id`/`client_id`/`client_secret`.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
    /// Backend-specific queries (PromQL, Datadog query strings, ...).
    #[serde(default)]
    pub queries: Vec<String>,
    /// Backend-specific metric identifiers (CloudWatch specs, GCP metric types, ...).
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Namespace filters, when applicable.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Static labels merged into every sample this source produces.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Free-form per-source options (e.g. `per_cpu`, `lookback_minutes`, `site`).
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    15
}

/// Outcome of a single poll of one source.
///
/// Transient: produced per poll, never persisted.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CollectionResult {
    /// Name of the source that was polled.
    pub source: String,
    /// Whether the poll succeeded.
    pub success: bool,
    /// Samples produced, if any.
    #[serde(default)]
    pub metrics: Vec<MetricSample>,
    /// Error description, present only when `success` is `false`.
    #[serde(default)]
    pub error: Option<String>,
    /// Wall-clock duration of the poll, in milliseconds.
    pub duration_ms: f64,
    /// When the poll completed.
    pub timestamp: DateTime<Utc>,
}

impl CollectionResult {
    /// Build a successful result.
    #[must_use]
    pub fn ok(source: impl Into<String>, metrics: Vec<MetricSample>, duration_ms: f64) -> Self {
        Self {
            source: source.into(),
            success: true,
            metrics,
            error: None,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    /// Build a failed result. `collect()` implementations must use this instead of
    /// propagating backend errors out of the poller loop.
    #[must_use]
    pub fn err(source: impl Into<String>, error: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            source: source.into(),
            success: false,
            metrics: Vec::new(),
            error: Some(error.into()),
            duration_ms,
            timestamp: Utc::now(),
        }
    }
}

/// Deployment environment tag.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// A named grouping of agents sharing an environment tag.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Deployment {
    /// Stable 8-character slug.
    pub id: String,
    /// Globally unique, human-chosen name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub environment: Environment,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Computed: number of agents currently belonging to this deployment.
    #[serde(default)]
    pub agents_count: u32,
    /// Computed: number of those agents with `status == online`.
    #[serde(default)]
    pub agents_online: u32,
    /// Computed: distinct metric name count across the deployment's agents.
    #[serde(default)]
    pub metrics_count: u64,
}

/// Liveness status of a registered agent. Always derived, never stored directly
/// as the source of truth (`last_seen` is); see [`crate::status`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Warning,
    Offline,
}

/// A registered collector instance.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Agent {
    pub id: String,
    pub deployment_id: String,
    pub hostname: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub agent_version: String,
    pub status: AgentStatus,
    pub last_seen: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default = "default_interval_u32")]
    pub collection_interval: u32,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub metrics_count: u64,
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

fn default_interval_u32() -> u32 {
    15
}

/// Metadata describing one loaded (or fallen-back) model slot.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub loaded: bool,
    pub framework: String,
    /// `true` when the in-memory equivalent is serving because the trained
    /// artifact failed to load.
    pub is_fallback: bool,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}
