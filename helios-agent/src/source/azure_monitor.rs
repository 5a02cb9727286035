//! Azure Monitor metrics source. Ported from
//! `original_source/agent/src/helios_agent/sources/azure_monitor.py`'s
//! service-principal-authenticated collector.
//!
//! No Azure SDK crate appears anywhere in the example pack (unlike AWS's
//! `aws-sdk-*` family and GCP's `gcp_auth`), so this source authenticates by
//! hand: a client-credentials OAuth2 POST to Azure AD, then bearer-authenticated
//! REST calls to the Azure Monitor metrics API, both over the `reqwest` client
//! already used by every other source.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use helios_core::model::{CollectionResult, MetricSample, MetricType, SourceConfig};
use serde::Deserialize;

use super::{merge_static_labels, register_source, Source, SourceClass};
use crate::error::SourceError;

const LOOKBACK_MINUTES: i64 = 5;

fn default_queries() -> Vec<String> {
    vec![
        "Percentage CPU".to_owned(),
        "Available Memory Bytes".to_owned(),
        "Network In Total".to_owned(),
        "Network Out Total".to_owned(),
        "Disk Read Bytes".to_owned(),
        "Disk Write Bytes".to_owned(),
    ]
}

/// Insert `_` before every uppercase char except the first, then lowercase:
/// `CPUUtilization` → `cpu_utilization`.
fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c);
    }
    out.to_lowercase()
}

/// `"Percentage CPU"` → `percentage_cpu`; `%` becomes `pct` before the rest.
fn normalize_metric_name(raw: &str) -> String {
    let snake = camel_to_snake(raw);
    snake.replace(' ', "_").replace('%', "pct").replace("__", "_")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MetricsListResponse {
    value: Vec<MetricEntry>,
}

#[derive(Debug, Deserialize)]
struct MetricEntry {
    name: LocalizableString,
    timeseries: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
struct LocalizableString {
    value: String,
}

#[derive(Debug, Deserialize)]
struct TimeSeries {
    data: Vec<DataPoint>,
}

#[derive(Debug, Deserialize)]
struct DataPoint {
    average: Option<f64>,
}

pub struct AzureMonitorSource {
    config: SourceConfig,
    client: Option<reqwest::Client>,
    token: Option<String>,
}

impl AzureMonitorSource {
    #[must_use]
    pub fn new(config: SourceConfig) -> Box<dyn Source> {
        Box::new(Self { config, client: None, token: None })
    }

    fn credential(&self, key: &str) -> Option<String> {
        self.config.credentials.get(key).cloned()
    }

    fn queries(&self) -> Vec<String> {
        if self.config.queries.is_empty() {
            default_queries()
        } else {
            self.config.queries.clone()
        }
    }

    async fn fetch_token(&self, client: &reqwest::Client) -> Result<String, String> {
        let tenant_id = self.credential("tenant_id").ok_or("missing tenant_id")?;
        let client_id = self.credential("client_id").ok_or("missing client_id")?;
        let client_secret = self.credential("client_secret").ok_or("missing client_secret")?;

        let url = format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", &client_id),
            ("client_secret", &client_secret),
            ("scope", "https://management.azure.com/.default"),
        ];
        let resp = client.post(url).form(&params).send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("token request failed: {}", resp.status()));
        }
        let body: TokenResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(body.access_token)
    }
}

#[async_trait]
impl Source for AzureMonitorSource {
    fn source_type(&self) -> &'static str {
        "azure_monitor"
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn initialize(&mut self) -> Result<(), SourceError> {
        let missing: Vec<&str> = Self::required_credentials()
            .into_iter()
            .filter(|key| self.credential(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(SourceError::CredentialRejected(format!("missing: {missing:?}")));
        }
        let client = reqwest::Client::new();
        let token = self
            .fetch_token(&client)
            .await
            .map_err(SourceError::CredentialRejected)?;
        self.client = Some(client);
        self.token = Some(token);
        Ok(())
    }

    async fn collect(&mut self) -> CollectionResult {
        let start = Instant::now();
        let Some(client) = self.client.clone() else {
            return CollectionResult::err(self.config.name.clone(), "not initialized".into(), elapsed_ms(start));
        };
        let Some(token) = self.token.clone() else {
            return CollectionResult::err(self.config.name.clone(), "not authenticated".into(), elapsed_ms(start));
        };
        let Some(resource_uri) = self.config.endpoint.clone() else {
            return CollectionResult::err(self.config.name.clone(), "no resource_uri configured".into(), elapsed_ms(start));
        };

        let now = Utc::now();
        let start_time = now - chrono::Duration::minutes(LOOKBACK_MINUTES);
        let timespan = format!("{}/{}", start_time.to_rfc3339(), now.to_rfc3339());
        let metric_names = self.queries().join(",");
        let url = format!("https://management.azure.com{resource_uri}/providers/Microsoft.Insights/metrics");

        let resp = client
            .get(url)
            .bearer_auth(&token)
            .query(&[
                ("api-version", "2019-07-01"),
                ("metricnames", &metric_names),
                ("timespan", &timespan),
                ("aggregation", "Average"),
            ])
            .send()
            .await;
        let resp = match resp {
            Ok(r) => r,
            Err(e) => return CollectionResult::err(self.config.name.clone(), e.to_string(), elapsed_ms(start)),
        };
        let body: MetricsListResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) => return CollectionResult::err(self.config.name.clone(), e.to_string(), elapsed_ms(start)),
        };

        let mut all = Vec::new();
        for entry in body.value {
            let Some(value) = entry
                .timeseries
                .first()
                .and_then(|ts| ts.data.iter().rev().find_map(|dp| dp.average))
            else {
                continue;
            };
            all.push(MetricSample {
                name: normalize_metric_name(&entry.name.value),
                value,
                timestamp: now,
                kind: MetricType::Gauge,
                labels: Default::default(),
                source: self.config.name.clone(),
            });
        }
        CollectionResult::ok(self.config.name.clone(), merge_static_labels(all, &self.config), elapsed_ms(start))
    }

    async fn health_check(&mut self) -> bool {
        self.client.is_some() && self.token.is_some()
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

impl SourceClass for AzureMonitorSource {
    fn required_credentials() -> Vec<&'static str> {
        vec!["tenant_id", "client_id", "client_secret", "subscription_id"]
    }

    fn default_queries() -> Vec<String> {
        default_queries()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

register_source!("azure_monitor", AzureMonitorSource::new, AzureMonitorSource);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_spaced_camel_case() {
        assert_eq!(normalize_metric_name("Percentage CPU"), "percentage_cpu");
        assert_eq!(normalize_metric_name("Available Memory Bytes"), "available_memory_bytes");
    }
}
