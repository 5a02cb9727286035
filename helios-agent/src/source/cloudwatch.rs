//! AWS CloudWatch metrics source. Ported from
//! `original_source/agent/src/helios_agent/sources/cloudwatch.py`.
//!
//! Uses `aws-sdk-cloudwatch` + `aws-config` (grounded via
//! `examples/MystenLabs-sui`'s dependency on the same AWS SDK family) in
//! place of the Python original's `boto3` client.

use std::time::Instant;

use async_trait::async_trait;
use aws_sdk_cloudwatch::{
    config::{Credentials, Region},
    types::{Dimension, Statistic},
    Client,
};
use chrono::Utc;
use helios_core::model::{CollectionResult, MetricSample, MetricType, SourceConfig};
use tracing::warn;

use super::{merge_static_labels, register_source, Source, SourceClass};
use crate::error::SourceError;

const LOOKBACK_SECONDS: i64 = 600;
const PERIOD_SECONDS: i32 = 300;

fn default_specs() -> Vec<String> {
    vec![
        "AWS/EC2/CPUUtilization".to_owned(),
        "AWS/EC2/NetworkIn".to_owned(),
        "AWS/EC2/NetworkOut".to_owned(),
        "AWS/RDS/CPUUtilization".to_owned(),
        "AWS/RDS/DatabaseConnections".to_owned(),
        "AWS/RDS/FreeableMemory".to_owned(),
    ]
}

struct MetricSpec {
    namespace: String,
    metric_name: String,
    dimensions: Vec<(String, String)>,
}

/// Parse `"Namespace/MetricName[:Dim=Val,Dim2=Val2]"`.
fn parse_spec(spec: &str) -> Option<MetricSpec> {
    let (path, dims) = spec.split_once(':').map_or((spec, ""), |(p, d)| (p, d));
    let mut parts: Vec<&str> = path.rsplitn(2, '/').collect();
    let metric_name = parts.remove(0).to_owned();
    let namespace = parts.pop()?.to_owned();
    let dimensions = dims
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
    Some(MetricSpec { namespace, metric_name, dimensions })
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

/// `AWS/EC2/CPUUtilization` → `ec2_cpu_utilization`.
fn normalize_metric_name(namespace: &str, metric_name: &str) -> String {
    let snake_metric = camel_to_snake(metric_name);
    let namespace_part = namespace.trim_start_matches("AWS/").to_lowercase();
    format!("{namespace_part}_{snake_metric}")
}

pub struct CloudWatchSource {
    config: SourceConfig,
    client: Option<Client>,
}

impl CloudWatchSource {
    #[must_use]
    pub fn new(config: SourceConfig) -> Box<dyn Source> {
        Box::new(Self { config, client: None })
    }

    fn specs(&self) -> Vec<String> {
        if self.config.metrics.is_empty() {
            default_specs()
        } else {
            self.config.metrics.clone()
        }
    }

    fn credential(&self, key: &str) -> Option<String> {
        self.config.credentials.get(key).cloned()
    }
}

#[async_trait]
impl Source for CloudWatchSource {
    fn source_type(&self) -> &'static str {
        "cloudwatch"
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
        let access_key = self.credential("aws_access_key_id").unwrap();
        let secret_key = self.credential("aws_secret_access_key").unwrap();
        let region = self.credential("region").unwrap();

        let credentials = Credentials::new(access_key, secret_key, None, None, "helios-agent");
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(credentials)
            .load()
            .await;
        self.client = Some(Client::new(&sdk_config));
        Ok(())
    }

    async fn collect(&mut self) -> CollectionResult {
        let start = Instant::now();
        let Some(client) = self.client.clone() else {
            return CollectionResult::err(self.config.name.clone(), "not initialized".into(), elapsed_ms(start));
        };

        let now = Utc::now();
        let start_time = now - chrono::Duration::seconds(LOOKBACK_SECONDS);
        let mut all = Vec::new();
        for spec_str in self.specs() {
            let Some(spec) = parse_spec(&spec_str) else { continue };
            let dimensions: Vec<Dimension> = spec
                .dimensions
                .iter()
                .filter_map(|(k, v)| Dimension::builder().name(k).value(v).build().ok())
                .collect();

            let result = client
                .get_metric_statistics()
                .namespace(&spec.namespace)
                .metric_name(&spec.metric_name)
                .set_dimensions(Some(dimensions.clone()))
                .start_time(aws_sdk_cloudwatch::primitives::DateTime::from_secs(start_time.timestamp()))
                .end_time(aws_sdk_cloudwatch::primitives::DateTime::from_secs(now.timestamp()))
                .period(PERIOD_SECONDS)
                .statistics(Statistic::Average)
                .send()
                .await;

            let output = match result {
                Ok(o) => o,
                Err(e) => {
                    warn!(spec = %spec_str, error = %e, "cloudwatch query failed, skipping");
                    continue;
                }
            };

            let mut datapoints = output.datapoints.unwrap_or_default();
            datapoints.sort_by_key(|dp| dp.timestamp.map(|t| t.secs()).unwrap_or_default());
            let Some(latest) = datapoints.last() else { continue };
            let Some(value) = latest.average else { continue };

            let mut labels: std::collections::BTreeMap<String, String> = spec.dimensions.into_iter().collect();
            labels.insert("namespace".to_owned(), spec.namespace.clone());
            all.push(MetricSample {
                name: normalize_metric_name(&spec.namespace, &spec.metric_name),
                value,
                timestamp: now,
                kind: MetricType::Gauge,
                labels,
                source: self.config.name.clone(),
            });
        }
        CollectionResult::ok(self.config.name.clone(), merge_static_labels(all, &self.config), elapsed_ms(start))
    }

    async fn health_check(&mut self) -> bool {
        let Some(client) = &self.client else { return false };
        client
            .list_metrics()
            .send()
            .await
            .is_ok()
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

impl SourceClass for CloudWatchSource {
    fn required_credentials() -> Vec<&'static str> {
        vec!["aws_access_key_id", "aws_secret_access_key", "region"]
    }

    fn default_queries() -> Vec<String> {
        default_specs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

register_source!("cloudwatch", CloudWatchSource::new, CloudWatchSource);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spec_with_dimensions() {
        let spec = parse_spec("AWS/EC2/CPUUtilization:InstanceId=i-1234").unwrap();
        assert_eq!(spec.namespace, "AWS/EC2");
        assert_eq!(spec.metric_name, "CPUUtilization");
        assert_eq!(spec.dimensions, vec![("InstanceId".to_owned(), "i-1234".to_owned())]);
    }

    #[test]
    fn normalizes_camel_case_metric_names() {
        assert_eq!(normalize_metric_name("AWS/EC2", "CPUUtilization"), "ec2_cpu_utilization");
        assert_eq!(normalize_metric_name("AWS/RDS", "DatabaseConnections"), "rds_database_connections");
    }
}
