//! GCP Cloud Monitoring source. Ported from
//! `original_source/agent/src/helios_agent/sources/gcp_monitoring.py`.
//!
//! Uses `gcp_auth` (grounded via `examples/MystenLabs-sui`'s dependency on the
//! same crate) for Application Default Credentials token acquisition, then
//! plain `reqwest` REST calls to the Cloud Monitoring `timeSeries.list` API —
//! there being no first-party `google-cloud-monitoring` crate in the corpus.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use gcp_auth::{AuthenticationManager, Token};
use helios_core::model::{CollectionResult, MetricSample, MetricType, SourceConfig};
use serde::Deserialize;
use tracing::warn;

use super::{merge_static_labels, register_source, Source, SourceClass};
use crate::error::SourceError;

const MONITORING_SCOPE: &str = "https://www.googleapis.com/auth/monitoring.read";
const LOOKBACK_MINUTES: i64 = 5;

fn default_queries() -> Vec<String> {
    vec![
        "compute.googleapis.com/instance/cpu/utilization".to_owned(),
        "compute.googleapis.com/instance/memory/balloon/ram_used".to_owned(),
        "compute.googleapis.com/instance/network/received_bytes_count".to_owned(),
        "compute.googleapis.com/instance/network/sent_bytes_count".to_owned(),
        "kubernetes.io/container/cpu/limit_utilization".to_owned(),
        "kubernetes.io/container/memory/limit_utilization".to_owned(),
        "kubernetes.io/container/restart_count".to_owned(),
        "kubernetes.io/pod/network/received_bytes_count".to_owned(),
    ]
}

fn aligner_for(metric_type: &str) -> &'static str {
    if ["utilization", "memory/used", "limit_utilization"]
        .iter()
        .any(|needle| metric_type.contains(needle))
    {
        "ALIGN_MEAN"
    } else {
        "ALIGN_RATE"
    }
}

/// Strip the domain prefix (first `/`-segment), join the remainder with `_`.
fn normalize_metric_name(metric_type: &str) -> String {
    let rest = metric_type.split_once('/').map_or(metric_type, |(_, r)| r);
    rest.replace('/', "_").replace('-', "_")
}

#[derive(Debug, Deserialize)]
struct TimeSeriesListResponse {
    #[serde(default)]
    #[serde(rename = "timeSeries")]
    time_series: Vec<TimeSeriesEntry>,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesEntry {
    metric: MetricDescriptor,
    resource: ResourceDescriptor,
    points: Vec<Point>,
}

#[derive(Debug, Default, Deserialize)]
struct MetricDescriptor {
    #[serde(rename = "type")]
    metric_type: String,
    #[serde(default)]
    labels: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceDescriptor {
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default)]
    labels: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Point {
    value: TypedValue,
}

#[derive(Debug, Default, Deserialize)]
struct TypedValue {
    #[serde(rename = "doubleValue")]
    double_value: Option<f64>,
    #[serde(rename = "int64Value")]
    int64_value: Option<String>,
    #[serde(rename = "boolValue")]
    bool_value: Option<bool>,
    #[serde(rename = "distributionValue")]
    distribution_value: Option<DistributionValue>,
}

#[derive(Debug, Default, Deserialize)]
struct DistributionValue {
    mean: Option<f64>,
}

/// Decode in order: double, int64, bool(→1/0), distribution mean, else 0.0.
fn extract_value(tv: &TypedValue) -> f64 {
    if let Some(v) = tv.double_value {
        return v;
    }
    if let Some(v) = &tv.int64_value {
        if let Ok(parsed) = v.parse::<f64>() {
            return parsed;
        }
    }
    if let Some(v) = tv.bool_value {
        return if v { 1.0 } else { 0.0 };
    }
    if let Some(mean) = tv.distribution_value.as_ref().and_then(|d| d.mean) {
        return mean;
    }
    0.0
}

pub struct GcpMonitoringSource {
    config: SourceConfig,
    client: Option<reqwest::Client>,
    auth: Option<AuthenticationManager>,
}

impl GcpMonitoringSource {
    #[must_use]
    pub fn new(config: SourceConfig) -> Box<dyn Source> {
        Box::new(Self { config, client: None, auth: None })
    }

    fn project_id(&self) -> Option<String> {
        self.config.credentials.get("project_id").cloned()
    }

    fn queries(&self) -> Vec<String> {
        if self.config.queries.is_empty() {
            default_queries()
        } else {
            self.config.queries.clone()
        }
    }

    async fn token(&self) -> Result<Token, String> {
        let auth = self.auth.as_ref().ok_or("not initialized")?;
        auth.get_token(&[MONITORING_SCOPE]).await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Source for GcpMonitoringSource {
    fn source_type(&self) -> &'static str {
        "gcp_monitoring"
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn initialize(&mut self) -> Result<(), SourceError> {
        if self.project_id().is_none() {
            return Err(SourceError::CredentialRejected("missing: [\"project_id\"]".into()));
        }
        let auth = AuthenticationManager::new()
            .await
            .map_err(|e| SourceError::CredentialRejected(e.to_string()))?;
        self.auth = Some(auth);
        self.client = Some(reqwest::Client::new());
        Ok(())
    }

    async fn collect(&mut self) -> CollectionResult {
        let start = Instant::now();
        let Some(client) = self.client.clone() else {
            return CollectionResult::err(self.config.name.clone(), "not initialized".into(), elapsed_ms(start));
        };
        let Some(project_id) = self.project_id() else {
            return CollectionResult::err(self.config.name.clone(), "missing project_id".into(), elapsed_ms(start));
        };
        let token = match self.token().await {
            Ok(t) => t,
            Err(e) => return CollectionResult::err(self.config.name.clone(), e, elapsed_ms(start)),
        };

        let now = Utc::now();
        let start_time = now - chrono::Duration::minutes(LOOKBACK_MINUTES);
        let url = format!("https://monitoring.googleapis.com/v3/projects/{project_id}/timeSeries");

        let mut all = Vec::new();
        for metric_type in self.queries() {
            let filter = format!("metric.type = \"{metric_type}\"");
            let resp = client
                .get(&url)
                .bearer_auth(token.as_str())
                .query(&[
                    ("filter", filter.as_str()),
                    ("interval.startTime", &start_time.to_rfc3339()),
                    ("interval.endTime", &now.to_rfc3339()),
                    ("aggregation.alignmentPeriod", "300s"),
                    ("aggregation.perSeriesAligner", aligner_for(&metric_type)),
                    ("view", "FULL"),
                ])
                .send()
                .await;
            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    warn!(metric_type = %metric_type, error = %e, "gcp monitoring query failed, skipping");
                    continue;
                }
            };
            let body: TimeSeriesListResponse = match resp.json().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(metric_type = %metric_type, error = %e, "gcp monitoring query response failed to parse, skipping");
                    continue;
                }
            };

            for ts in body.time_series {
                let Some(point) = ts.points.first() else { continue };
                let mut labels = ts.metric.labels.clone();
                for (k, v) in &ts.resource.labels {
                    labels.insert(format!("resource_{k}"), v.clone());
                }
                labels.insert("resource_type".to_owned(), ts.resource.resource_type.clone());
                all.push(MetricSample {
                    name: normalize_metric_name(&ts.metric.metric_type),
                    value: extract_value(&point.value),
                    timestamp: now,
                    kind: MetricType::Gauge,
                    labels,
                    source: self.config.name.clone(),
                });
            }
        }
        CollectionResult::ok(self.config.name.clone(), merge_static_labels(all, &self.config), elapsed_ms(start))
    }

    async fn health_check(&mut self) -> bool {
        self.token().await.is_ok()
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

impl SourceClass for GcpMonitoringSource {
    fn required_credentials() -> Vec<&'static str> {
        vec!["project_id"]
    }

    fn default_queries() -> Vec<String> {
        default_queries()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

register_source!("gcp_monitoring", GcpMonitoringSource::new, GcpMonitoringSource);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligner_picks_mean_for_utilization_metrics() {
        assert_eq!(aligner_for("compute.googleapis.com/instance/cpu/utilization"), "ALIGN_MEAN");
        assert_eq!(aligner_for("kubernetes.io/container/memory/limit_utilization"), "ALIGN_MEAN");
        assert_eq!(aligner_for("compute.googleapis.com/instance/network/sent_bytes_count"), "ALIGN_RATE");
    }

    #[test]
    fn normalizes_by_stripping_domain_prefix() {
        assert_eq!(normalize_metric_name("compute.googleapis.com/instance/cpu/utilization"), "instance_cpu_utilization");
    }

    #[test]
    fn extract_value_prefers_double_then_falls_back() {
        let tv = TypedValue { int64_value: Some("42".into()), ..Default::default() };
        assert_eq!(extract_value(&tv), 42.0);
        let tv = TypedValue { bool_value: Some(true), ..Default::default() };
        assert_eq!(extract_value(&tv), 1.0);
        assert_eq!(extract_value(&TypedValue::default()), 0.0);
    }
}
