//! Process configuration for the inference server.
//!
//! Grounded in `original_source/ml/inference/config.py`'s dataclass tree
//! (`ServerConfig`/`ModelConfig`/`MetricsConfig`/`AnomalyConfig`/
//! `RecommendationConfig`), loaded with the `config` crate the way
//! `helios_agent::config::AgentConfig` loads its own YAML document.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{auth::AuthConfig, logging::LoggingConfig};

/// Error loading or validating [`InferenceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse config: {0}")]
    Parse(#[from] config::ConfigError),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database file path. Relative to the process working directory.
    pub db_path: PathBuf,
    /// Upper bound on rows kept in the metrics table.
    pub max_points: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            db_path: PathBuf::from("helios.db"),
            max_points: 100_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    pub baseline_enabled: bool,
    pub prophet_enabled: bool,
    pub xgboost_enabled: bool,
    pub cache_predictions: bool,
    pub cache_ttl_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("/app/models"),
            baseline_enabled: true,
            prophet_enabled: true,
            xgboost_enabled: true,
            cache_predictions: true,
            cache_ttl_seconds: 300,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "helios".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub default_threshold_sigma: f64,
    pub min_data_points: usize,
    pub severity_low: f64,
    pub severity_medium: f64,
    pub severity_high: f64,
    pub severity_critical: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            default_threshold_sigma: 2.5,
            min_data_points: 12,
            severity_low: 2.0,
            severity_medium: 2.5,
            severity_high: 3.0,
            severity_critical: 4.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub target_utilization: f64,
    pub scale_up_threshold: f64,
    pub scale_down_threshold: f64,
    pub cooldown_minutes: i64,
    pub min_replicas: u32,
    pub max_replicas: u32,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            target_utilization: 0.7,
            scale_up_threshold: 0.85,
            scale_down_threshold: 0.30,
            cooldown_minutes: 5,
            min_replicas: 1,
            max_replicas: 100,
        }
    }
}

/// Top-level server configuration, loaded from a single YAML document.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub metrics: MetricsConfig,
    pub anomaly: AnomalyConfig,
    pub recommendation: RecommendationConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

impl InferenceConfig {
    /// Load configuration from an explicit path, or discover it at
    /// `./helios-server.yaml` / `/etc/helios/server.yaml`, falling back to
    /// defaults plus environment overrides when nothing is found.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        let candidate = explicit_path
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("./helios-server.yaml")).filter(|p| p.exists()))
            .or_else(|| Some(PathBuf::from("/etc/helios/server.yaml")).filter(|p| p.exists()));

        if let Some(path) = &candidate {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("HELIOS_SERVER").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = InferenceConfig::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.anomaly.min_data_points, 12);
        assert_eq!(cfg.recommendation.cooldown_minutes, 5);
    }

    #[test]
    fn load_without_file_falls_back_to_defaults() {
        let cfg = InferenceConfig::load(None).expect("load should not fail without a file");
        assert_eq!(cfg.server.host, "0.0.0.0");
    }
}
