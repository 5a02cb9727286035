//! Datadog metrics query source. Ported from
//! `original_source/agent/src/helios_agent/sources/datadog.py`.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use helios_core::model::{CollectionResult, MetricSample, MetricType, SourceConfig};
use serde::Deserialize;
use tracing::warn;

use super::{merge_static_labels, register_source, Source, SourceClass};
use crate::error::SourceError;

const LOOKBACK_MINUTES: i64 = 5;

fn site_endpoint(site: &str) -> &'static str {
    match site {
        "us3" => "https://api.us3.datadoghq.com",
        "us5" => "https://api.us5.datadoghq.com",
        "eu1" => "https://api.datadoghq.eu",
        "ap1" => "https://api.ap1.datadoghq.com",
        _ => "https://api.datadoghq.com",
    }
}

fn default_queries() -> Vec<String> {
    vec![
        "system.cpu.user".to_owned(),
        "system.cpu.system".to_owned(),
        "system.cpu.idle".to_owned(),
        "system.mem.used".to_owned(),
        "system.mem.total".to_owned(),
        "system.net.bytes_rcvd".to_owned(),
        "system.net.bytes_sent".to_owned(),
    ]
}

/// Strip a leading `system|aws|azure|gcp` segment, join the rest with `_`.
fn normalize_metric_name(raw: &str) -> String {
    let mut parts: Vec<&str> = raw.split('.').collect();
    if let Some(first) = parts.first() {
        if matches!(*first, "system" | "aws" | "azure" | "gcp") {
            parts.remove(0);
        }
    }
    parts.join("_")
}

fn parse_scope(scope: &str) -> std::collections::BTreeMap<String, String> {
    scope
        .split(',')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .collect()
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    series: Vec<Series>,
}

#[derive(Debug, Deserialize)]
struct Series {
    metric: String,
    scope: String,
    pointlist: Vec<(f64, Option<f64>)>,
}

pub struct DatadogSource {
    config: SourceConfig,
    client: Option<reqwest::Client>,
}

impl DatadogSource {
    #[must_use]
    pub fn new(config: SourceConfig) -> Box<dyn Source> {
        Box::new(Self { config, client: None })
    }

    fn site(&self) -> &'static str {
        let site = self.config.options.get("site").and_then(serde_json::Value::as_str).unwrap_or("us1");
        site_endpoint(site)
    }

    fn api_key(&self) -> Option<String> {
        self.config.api_key.clone().or_else(|| self.config.credentials.get("api_key").cloned())
    }

    fn app_key(&self) -> Option<String> {
        self.config.credentials.get("app_key").cloned()
    }

    fn queries(&self) -> Vec<String> {
        if self.config.queries.is_empty() {
            default_queries()
        } else {
            self.config.queries.clone()
        }
    }
}

#[async_trait]
impl Source for DatadogSource {
    fn source_type(&self) -> &'static str {
        "datadog"
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn initialize(&mut self) -> Result<(), SourceError> {
        let missing: Vec<&str> = DatadogSource::required_credentials()
            .into_iter()
            .filter(|key| match *key {
                "api_key" => self.api_key().is_none(),
                "app_key" => self.app_key().is_none(),
                _ => false,
            })
            .collect();
        if !missing.is_empty() {
            return Err(SourceError::CredentialRejected(format!("missing: {missing:?}")));
        }
        self.client = Some(reqwest::Client::new());
        Ok(())
    }

    async fn collect(&mut self) -> CollectionResult {
        let start = Instant::now();
        let Some(client) = self.client.clone() else {
            return CollectionResult::err(self.config.name.clone(), "not initialized".into(), elapsed_ms(start));
        };
        let (Some(api_key), Some(app_key)) = (self.api_key(), self.app_key()) else {
            return CollectionResult::err(self.config.name.clone(), "missing credentials".into(), elapsed_ms(start));
        };

        let now = Utc::now();
        let to = now.timestamp();
        let from = to - LOOKBACK_MINUTES * 60;
        let mut all = Vec::new();
        for query in self.queries() {
            let url = format!("{}/api/v1/query", self.site());
            let resp = client
                .get(url)
                .header("DD-API-KEY", &api_key)
                .header("DD-APPLICATION-KEY", &app_key)
                .query(&[("query", query.as_str()), ("from", &from.to_string()), ("to", &to.to_string())])
                .send()
                .await;
            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    warn!(query = %query, error = %e, "datadog query failed, skipping");
                    continue;
                }
            };
            let body: SeriesResponse = match resp.json().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(query = %query, error = %e, "datadog query response failed to parse, skipping");
                    continue;
                }
            };
            for series in body.series {
                let Some((_, Some(value))) = series.pointlist.last().copied() else { continue };
                all.push(MetricSample {
                    name: normalize_metric_name(&series.metric),
                    value,
                    timestamp: now,
                    kind: MetricType::Gauge,
                    labels: parse_scope(&series.scope),
                    source: self.config.name.clone(),
                });
            }
        }
        CollectionResult::ok(self.config.name.clone(), merge_static_labels(all, &self.config), elapsed_ms(start))
    }

    async fn health_check(&mut self) -> bool {
        let Some(client) = &self.client else { return false };
        let (Some(api_key), Some(app_key)) = (self.api_key(), self.app_key()) else { return false };
        client
            .get(format!("{}/api/v1/validate", self.site()))
            .header("DD-API-KEY", api_key)
            .header("DD-APPLICATION-KEY", app_key)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

impl SourceClass for DatadogSource {
    fn required_credentials() -> Vec<&'static str> {
        vec!["api_key", "app_key"]
    }

    fn default_queries() -> Vec<String> {
        default_queries()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

register_source!("datadog", DatadogSource::new, DatadogSource);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_system_prefix() {
        assert_eq!(normalize_metric_name("system.cpu.user"), "cpu_user");
        assert_eq!(normalize_metric_name("aws.ec2.cpuutilization"), "ec2_cpuutilization");
    }

    #[test]
    fn parses_scope_into_labels() {
        let labels = parse_scope("host:web-1,env:prod");
        assert_eq!(labels.get("host").map(String::as_str), Some("web-1"));
        assert_eq!(labels.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn site_endpoint_defaults_to_us1() {
        assert_eq!(site_endpoint("unknown"), "https://api.datadoghq.com");
        assert_eq!(site_endpoint("eu1"), "https://api.datadoghq.eu");
    }
}
