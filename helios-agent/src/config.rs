//! Agent configuration: file format, env overrides, and the load search order.

use std::path::{Path, PathBuf};

use helios_core::model::SourceConfig;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, logging::LoggingConfig};

/// Connection details for the inference server.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct HeliosEndpoint {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: u64,
    pub retry_attempts: u32,
    pub retry_delay: f64,
}

impl Default for HeliosEndpoint {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".into(),
            api_key: None,
            timeout: 30,
            retry_attempts: 3,
            retry_delay: 1.0,
        }
    }
}

/// Top-level agent configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub endpoint: HeliosEndpoint,
    pub sources: Vec<SourceConfig>,
    pub batch_size: usize,
    pub flush_interval: u64,
    pub logging: LoggingConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: HeliosEndpoint::default(),
            sources: Vec::new(),
            batch_size: 100,
            flush_interval: 10,
            logging: LoggingConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load from an explicit YAML file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("HELIOS").separator("__"))
            .build()?;
        let mut cfg: Self = settings.try_deserialize()?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Build configuration purely from the environment, defaulting to a single
    /// `system` source when nothing else is configured.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        if let Ok(prom_url) = std::env::var("PROMETHEUS_URL") {
            cfg.sources.push(SourceConfig {
                name: "prometheus".into(),
                source_type: "prometheus".into(),
                endpoint: Some(prom_url),
                ..Default::default()
            });
        }
        if let Ok(dd_key) = std::env::var("DATADOG_API_KEY") {
            cfg.sources.push(SourceConfig {
                name: "datadog".into(),
                source_type: "datadog".into(),
                api_key: Some(dd_key),
                ..Default::default()
            });
        }
        if cfg.sources.is_empty() {
            cfg.sources.push(default_system_source());
        }
        cfg
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("HELIOS_ENDPOINT") {
            self.endpoint.url = endpoint;
        }
        if let Ok(key) = std::env::var("HELIOS_API_KEY") {
            self.endpoint.api_key = Some(key);
        }
        for source in &mut self.sources {
            let env_name = format!("{}_API_KEY", source.source_type.to_uppercase());
            if let Ok(key) = std::env::var(env_name) {
                source.api_key = Some(key);
            }
        }
    }
}

fn default_system_source() -> SourceConfig {
    let mut options = serde_json::Map::new();
    options.insert("collect_cpu".into(), true.into());
    options.insert("collect_memory".into(), true.into());
    options.insert("collect_disk".into(), true.into());
    options.insert("collect_network".into(), true.into());
    SourceConfig {
        name: "system".into(),
        source_type: "system".into(),
        enabled: true,
        interval: 15,
        options,
        ..Default::default()
    }
}

/// Load agent configuration following the documented search order: an explicit
/// path, then `./helios-agent.yaml`, `./helios-agent.yml`,
/// `~/.helios/agent.yaml`, `/etc/helios/agent.yaml`, falling back to
/// environment-derived configuration.
pub fn load_config(explicit_path: Option<&Path>) -> Result<AgentConfig, ConfigError> {
    if let Some(path) = explicit_path {
        return AgentConfig::from_file(path);
    }
    let mut candidates: Vec<PathBuf> =
        vec!["./helios-agent.yaml".into(), "./helios-agent.yml".into()];
    if let Some(home) = dirs_home() {
        candidates.push(home.join(".helios").join("agent.yaml"));
    }
    candidates.push("/etc/helios/agent.yaml".into());

    for candidate in candidates {
        if candidate.is_file() {
            return AgentConfig::from_file(&candidate);
        }
    }
    Ok(AgentConfig::from_env())
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_sources() {
        let cfg = AgentConfig::default();
        assert!(cfg.sources.is_empty());
        assert_eq!(cfg.batch_size, 100);
    }

    #[test]
    fn from_env_without_vars_falls_back_to_system_source() {
        let cfg = AgentConfig::from_env();
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].source_type, "system");
    }
}
