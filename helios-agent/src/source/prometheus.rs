//! Prometheus HTTP API source. Ported from
//! `original_source/agent/src/helios_agent/sources/prometheus.py`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use helios_core::model::{CollectionResult, MetricSample, MetricType, SourceConfig};
use serde::Deserialize;
use tracing::warn;

use super::{merge_static_labels, register_source, Source, SourceClass};
use crate::error::SourceError;

fn default_queries() -> Vec<String> {
    vec![
        "sum(rate(container_cpu_usage_seconds_total[5m])) by (namespace, pod)".to_owned(),
        "sum(container_memory_working_set_bytes) by (namespace, pod)".to_owned(),
        "sum(rate(container_network_receive_bytes_total[5m])) by (namespace, pod)".to_owned(),
        "sum(rate(container_network_transmit_bytes_total[5m])) by (namespace, pod)".to_owned(),
    ]
}

/// Derive a metric name from a PromQL query when the result carries no
/// `__name__` label: split on the first of `(`, `{`, `[` and snake_case it.
fn query_to_name(query: &str) -> String {
    let cut = query
        .find(['(', '{', '['])
        .map_or(query.len(), |idx| idx);
    query[..cut].trim().to_lowercase().replace([' ', '-'], "_")
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    metric: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    value: Option<(f64, String)>,
    #[serde(default)]
    values: Option<Vec<(f64, String)>>,
}

pub struct PrometheusSource {
    config: SourceConfig,
    client: Option<reqwest::Client>,
}

impl PrometheusSource {
    #[must_use]
    pub fn new(config: SourceConfig) -> Box<dyn Source> {
        Box::new(Self { config, client: None })
    }

    fn queries(&self) -> Vec<String> {
        if self.config.queries.is_empty() {
            default_queries()
        } else {
            self.config.queries.clone()
        }
    }

    async fn run_query(&self, client: &reqwest::Client, base: &str, query: &str) -> Result<Vec<MetricSample>, String> {
        let url = format!("{base}/api/v1/query");
        let resp = client
            .get(url)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let body: QueryResponse = resp.json().await.map_err(|e| e.to_string())?;
        if body.status != "success" {
            return Err(format!("query status: {}", body.status));
        }
        let Some(data) = body.data else {
            return Ok(Vec::new());
        };

        let now = Utc::now();
        let default_name = query_to_name(query);
        let mut samples = Vec::new();
        for item in data.result {
            let mut labels = item.metric.clone();
            let name = labels.remove("__name__").unwrap_or_else(|| default_name.clone());
            let point = match data.result_type.as_str() {
                "vector" => item.value.clone(),
                "matrix" => item.values.as_ref().and_then(|v| v.last().cloned()),
                _ => None,
            };
            let Some((_, value_str)) = point else { continue };
            let Ok(value) = value_str.parse::<f64>() else { continue };
            samples.push(MetricSample {
                name,
                value,
                timestamp: now,
                kind: MetricType::Gauge,
                labels,
                source: self.config.name.clone(),
            });
        }
        Ok(samples)
    }
}

#[async_trait]
impl Source for PrometheusSource {
    fn source_type(&self) -> &'static str {
        "prometheus"
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn initialize(&mut self) -> Result<(), SourceError> {
        if self.config.endpoint.is_none() {
            return Err(SourceError::Backend("prometheus source requires an endpoint".into()));
        }
        self.client = Some(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| SourceError::Backend(e.to_string()))?,
        );
        Ok(())
    }

    async fn collect(&mut self) -> CollectionResult {
        let start = Instant::now();
        let Some(client) = self.client.clone() else {
            return CollectionResult::err(self.config.name.clone(), "not initialized".into(), elapsed_ms(start));
        };
        let Some(base) = self.config.endpoint.clone() else {
            return CollectionResult::err(self.config.name.clone(), "no endpoint configured".into(), elapsed_ms(start));
        };

        let mut all = Vec::new();
        for query in self.queries() {
            match self.run_query(&client, &base, &query).await {
                Ok(samples) => all.extend(samples),
                Err(e) => warn!(query = %query, error = %e, "prometheus query failed, skipping"),
            }
        }
        CollectionResult::ok(self.config.name.clone(), merge_static_labels(all, &self.config), elapsed_ms(start))
    }

    async fn health_check(&mut self) -> bool {
        let Some(client) = &self.client else { return false };
        let Some(base) = &self.config.endpoint else { return false };
        client
            .get(format!("{base}/-/healthy"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

impl SourceClass for PrometheusSource {
    fn required_credentials() -> Vec<&'static str> {
        Vec::new()
    }

    fn default_queries() -> Vec<String> {
        default_queries()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

register_source!("prometheus", PrometheusSource::new, PrometheusSource);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_to_name_splits_on_first_delimiter() {
        assert_eq!(query_to_name("sum(rate(foo_total[5m])) by (pod)"), "sum");
        assert_eq!(query_to_name("node_cpu_seconds_total"), "node_cpu_seconds_total");
    }

    #[test]
    fn default_queries_are_non_empty() {
        assert_eq!(default_queries().len(), 4);
    }
}
