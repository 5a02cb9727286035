//! Host counters source. Ported from
//! `original_source/agent/src/helios_agent/sources/system.py`'s `psutil`-based
//! collector, using `sysinfo` as the Rust-native equivalent.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use helios_core::model::{CollectionResult, MetricSample, MetricType, SourceConfig};
use sysinfo::{Disks, Networks, System};
use tracing::debug;

use super::{merge_static_labels, register_source, Source, SourceClass};
use crate::error::SourceError;

fn option_bool(config: &SourceConfig, key: &str, default: bool) -> bool {
    config
        .options
        .get(key)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(default)
}

/// Collects CPU/memory/disk/network utilization from the local host.
pub struct SystemSource {
    config: SourceConfig,
    sys: System,
    hostname: String,
}

impl SystemSource {
    #[must_use]
    pub fn new(config: SourceConfig) -> Box<dyn Source> {
        Box::new(Self {
            config,
            sys: System::new(),
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_owned()),
        })
    }

    fn collect_samples(&mut self) -> Vec<MetricSample> {
        let now = Utc::now();
        let mut samples = Vec::new();

        self.sys.refresh_cpu_all();
        if option_bool(&self.config, "collect_cpu", true) {
            let global = self.sys.global_cpu_usage() / 100.0;
            samples.push(MetricSample {
                name: "cpu_utilization".to_owned(),
                value: f64::from(global),
                timestamp: now,
                kind: MetricType::Gauge,
                labels: Default::default(),
                source: self.config.name.clone(),
            });
            if option_bool(&self.config, "per_cpu", false) {
                for (idx, cpu) in self.sys.cpus().iter().enumerate() {
                    let mut labels = std::collections::BTreeMap::new();
                    labels.insert("cpu".to_owned(), idx.to_string());
                    samples.push(MetricSample {
                        name: "cpu_utilization".to_owned(),
                        value: f64::from(cpu.cpu_usage() / 100.0),
                        timestamp: now,
                        kind: MetricType::Gauge,
                        labels,
                        source: self.config.name.clone(),
                    });
                }
            }
        }

        self.sys.refresh_memory();
        if option_bool(&self.config, "collect_memory", true) {
            let total = self.sys.total_memory();
            let used = self.sys.used_memory();
            let utilization = if total > 0 { used as f64 / total as f64 } else { 0.0 };
            samples.push(MetricSample {
                name: "memory_utilization".to_owned(),
                value: utilization,
                timestamp: now,
                kind: MetricType::Gauge,
                labels: Default::default(),
                source: self.config.name.clone(),
            });
            for (label, value) in [("used", used), ("total", total)] {
                let mut labels = std::collections::BTreeMap::new();
                labels.insert("type".to_owned(), label.to_owned());
                samples.push(MetricSample {
                    name: "memory_bytes".to_owned(),
                    value: value as f64,
                    timestamp: now,
                    kind: MetricType::Gauge,
                    labels,
                    source: self.config.name.clone(),
                });
            }
        }

        if option_bool(&self.config, "collect_disk", true) {
            let disks = Disks::new_with_refreshed_list();
            for disk in disks.list() {
                let total = disk.total_space();
                if total == 0 {
                    continue;
                }
                let used = total.saturating_sub(disk.available_space());
                let mut labels = std::collections::BTreeMap::new();
                labels.insert("device".to_owned(), disk.name().to_string_lossy().into_owned());
                labels.insert(
                    "mountpoint".to_owned(),
                    disk.mount_point().to_string_lossy().into_owned(),
                );
                samples.push(MetricSample {
                    name: "disk_utilization".to_owned(),
                    value: used as f64 / total as f64,
                    timestamp: now,
                    kind: MetricType::Gauge,
                    labels,
                    source: self.config.name.clone(),
                });
            }
        }

        if option_bool(&self.config, "collect_network", true) {
            let networks = Networks::new_with_refreshed_list();
            let (recv, sent) = networks
                .iter()
                .fold((0u64, 0u64), |(r, s), (_, data)| (r + data.total_received(), s + data.total_transmitted()));
            samples.push(MetricSample {
                name: "network_bytes_recv".to_owned(),
                value: recv as f64,
                timestamp: now,
                kind: MetricType::Counter,
                labels: Default::default(),
                source: self.config.name.clone(),
            });
            samples.push(MetricSample {
                name: "network_bytes_sent".to_owned(),
                value: sent as f64,
                timestamp: now,
                kind: MetricType::Counter,
                labels: Default::default(),
                source: self.config.name.clone(),
            });
        }

        for sample in &mut samples {
            sample.labels.entry("host".to_owned()).or_insert_with(|| self.hostname.clone());
        }
        merge_static_labels(samples, &self.config)
    }
}

#[async_trait]
impl Source for SystemSource {
    fn source_type(&self) -> &'static str {
        "system"
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn initialize(&mut self) -> Result<(), SourceError> {
        self.sys.refresh_all();
        debug!(source = %self.config.name, "system source initialized");
        Ok(())
    }

    async fn collect(&mut self) -> CollectionResult {
        let start = std::time::Instant::now();
        let samples = self.collect_samples();
        CollectionResult::ok(self.config.name.clone(), samples, duration_ms(start.elapsed()))
    }

    async fn health_check(&mut self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

impl SourceClass for SystemSource {
    fn required_credentials() -> Vec<&'static str> {
        Vec::new()
    }

    fn default_queries() -> Vec<String> {
        Vec::new()
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

register_source!("system", SystemSource::new, SystemSource);

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SourceConfig {
        SourceConfig {
            name: "system".into(),
            source_type: "system".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn collect_produces_host_labeled_samples() {
        let mut source = SystemSource {
            config: config(),
            sys: System::new_all(),
            hostname: "test-host".into(),
        };
        let result = source.collect().await;
        assert!(result.success);
        assert!(result.metrics.iter().all(|m| m.labels.contains_key("host")));
        assert!(result.metrics.iter().any(|m| m.name == "cpu_utilization"));
        assert!(result.metrics.iter().any(|m| m.name == "memory_utilization"));
    }

    #[tokio::test]
    async fn health_check_is_always_true() {
        let mut source = SystemSource {
            config: config(),
            sys: System::new(),
            hostname: "test-host".into(),
        };
        assert!(source.health_check().await);
    }
}
