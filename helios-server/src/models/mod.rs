//! Model manager: loads (or falls back for) the three named forecasting and
//! anomaly-detection models served by the prediction/detection endpoints.
//!
//! Grounded in `original_source/ml/inference/model_manager.py::ModelManager`.
//! Trained-artifact bytes (`pickle`/`joblib`) are Python-specific and out of
//! scope — `model.pkl`'s mere *presence* under `<models_dir>/<name>/1.0.0/`
//! switches a model's [`helios_core::model::ModelInfo::is_fallback`] flag and
//! pulls metadata from a sibling `metadata.json`; the actual arithmetic run at
//! predict/detect time is the same moving-average/z-score logic either way,
//! since there is no trained artifact this server can execute.

pub mod baseline;
pub mod prophet;
pub mod xgboost;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use helios_core::model::ModelInfo;
use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;

pub use baseline::BaselineForecaster;
pub use prophet::ProphetForecaster;
pub use xgboost::XgboostAnomalyModel;

use crate::config::ModelConfig;

/// Error surfaced by model loading. Predict/detect requests for an unknown or
/// disabled model name surface as [`ModelError::Unknown`], not a load failure.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown or disabled model: {0}")]
    Unknown(String),
    #[error("models are not loaded yet")]
    NotLoaded,
}

/// Forecasting model contract, implemented by `baseline` and `prophet`.
pub trait Forecaster: Send + Sync {
    /// Append an observed value to the model's rolling history for `metric`.
    fn update(&self, metric: &str, value: f64);
    /// Predict the next `periods` values for `metric`.
    fn predict(&self, metric: &str, periods: u32) -> Vec<f64>;
    /// Lower/upper confidence bounds for the same prediction horizon.
    fn confidence_interval(&self, metric: &str, periods: u32, confidence: f64) -> (Vec<f64>, Vec<f64>);
}

/// Anomaly-scoring model contract, implemented by `xgboost`.
pub trait AnomalyModel: Send + Sync {
    /// Fit (or refit) the model's statistics for `metric` on a batch of values.
    fn fit(&self, metric: &str, values: &[f64]);
    /// Anomaly score for a single observed value, given prior fitting.
    fn score(&self, metric: &str, value: f64) -> f64;
}

#[derive(Debug, Deserialize)]
struct ArtifactMetadata {
    #[serde(default)]
    framework: Option<String>,
    #[serde(default)]
    metrics: BTreeMap<String, f64>,
}

fn probe_artifact(models_dir: &Path, name: &str) -> (bool, ArtifactMetadata) {
    let dir = models_dir.join(name).join("1.0.0");
    let trained = dir.join("model.pkl").is_file();
    let metadata = std::fs::read(dir.join("metadata.json"))
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or(ArtifactMetadata {
            framework: None,
            metrics: BTreeMap::new(),
        });
    (trained, metadata)
}

fn build_info(name: &str, default_framework: &str, trained: bool, metadata: ArtifactMetadata) -> ModelInfo {
    ModelInfo {
        name: name.to_owned(),
        version: if trained { "1.0.0".to_owned() } else { "1.0.0-inmemory".to_owned() },
        loaded: true,
        framework: metadata.framework.unwrap_or_else(|| default_framework.to_owned()),
        is_fallback: !trained,
        metrics: metadata.metrics,
    }
}

/// Loads, holds, and dispatches the baseline/prophet/xgboost models.
pub struct ModelManager {
    models_dir: PathBuf,
    config: ModelConfig,
    baseline: Option<Arc<BaselineForecaster>>,
    prophet: Option<Arc<ProphetForecaster>>,
    xgboost: Option<Arc<XgboostAnomalyModel>>,
    info: RwLock<BTreeMap<String, ModelInfo>>,
    loaded_at: RwLock<Option<DateTime<Utc>>>,
}

impl ModelManager {
    #[must_use]
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            models_dir: config.models_dir.clone(),
            config: config.clone(),
            baseline: None,
            prophet: None,
            xgboost: None,
            info: RwLock::new(BTreeMap::new()),
            loaded_at: RwLock::new(None),
        }
    }

    /// Load every enabled model, falling back to an in-memory equivalent for
    /// any whose trained artifact is absent. Always succeeds: per the
    /// fallback-always-succeeds contract, a missing or unreadable artifact is
    /// not a load failure, just a fallback model with `is_fallback = true`.
    pub fn load(&mut self) {
        let mut info = BTreeMap::new();

        if self.config.baseline_enabled {
            let (trained, metadata) = probe_artifact(&self.models_dir, "baseline");
            self.baseline = Some(Arc::new(BaselineForecaster::new(12)));
            info.insert("baseline".to_owned(), build_info("baseline", "baseline", trained, metadata));
        }
        if self.config.prophet_enabled {
            let (trained, metadata) = probe_artifact(&self.models_dir, "prophet");
            self.prophet = Some(Arc::new(ProphetForecaster::new(12)));
            info.insert("prophet".to_owned(), build_info("prophet", "prophet", trained, metadata));
        }
        if self.config.xgboost_enabled {
            let (trained, metadata) = probe_artifact(&self.models_dir, "xgboost");
            self.xgboost = Some(Arc::new(XgboostAnomalyModel::new(2.5)));
            info.insert("xgboost".to_owned(), build_info("xgboost", "xgboost", trained, metadata));
        }

        *self.info.write() = info;
        *self.loaded_at.write() = Some(Utc::now());
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !self.info.read().is_empty()
    }

    #[must_use]
    pub fn model_count(&self) -> usize {
        self.info.read().len()
    }

    #[must_use]
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        *self.loaded_at.read()
    }

    #[must_use]
    pub fn list_models(&self) -> Vec<ModelInfo> {
        self.info.read().values().cloned().collect()
    }

    /// Resolve a forecaster by name (`"baseline"` or `"prophet"`; any other
    /// name, including an unloaded one, is [`ModelError::Unknown`]).
    pub fn forecaster(&self, name: &str) -> Result<Arc<dyn Forecaster>, ModelError> {
        match name {
            "baseline" => self
                .baseline
                .clone()
                .map(|m| m as Arc<dyn Forecaster>)
                .ok_or_else(|| ModelError::Unknown(name.to_owned())),
            "prophet" => self
                .prophet
                .clone()
                .map(|m| m as Arc<dyn Forecaster>)
                .ok_or_else(|| ModelError::Unknown(name.to_owned())),
            other => Err(ModelError::Unknown(other.to_owned())),
        }
    }

    #[must_use]
    pub fn xgboost(&self) -> Option<Arc<XgboostAnomalyModel>> {
        self.xgboost.clone()
    }

    /// Default model name used when a predict request omits one.
    #[must_use]
    pub fn default_forecaster_name(&self) -> &'static str {
        "baseline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_without_artifacts_yields_fallback_models() {
        let mut manager = ModelManager::new(&ModelConfig {
            models_dir: PathBuf::from("/nonexistent/path/for/test"),
            baseline_enabled: true,
            prophet_enabled: true,
            xgboost_enabled: true,
            cache_predictions: true,
            cache_ttl_seconds: 300,
        });
        manager.load();
        assert_eq!(manager.model_count(), 3);
        let models = manager.list_models();
        assert!(models.iter().all(|m| m.is_fallback));
        assert!(manager.forecaster("baseline").is_ok());
        assert!(manager.forecaster("nonexistent").is_err());
    }

    #[test]
    fn disabled_model_is_not_loaded() {
        let mut manager = ModelManager::new(&ModelConfig {
            models_dir: PathBuf::from("/nonexistent/path/for/test"),
            baseline_enabled: true,
            prophet_enabled: false,
            xgboost_enabled: false,
            cache_predictions: true,
            cache_ttl_seconds: 300,
        });
        manager.load();
        assert_eq!(manager.model_count(), 1);
        assert!(manager.forecaster("prophet").is_err());
    }
}
