//! Prediction caching and point generation.
//!
//! Ported from `original_source/ml/inference/predictor.py::PredictorService.predict`:
//! cache on `metric:periods:model`, reuse while younger than
//! `cache_ttl_seconds`, otherwise regenerate a five-minute-stepped horizon
//! from the resolved forecaster.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use helios_core::wire::{PredictMetadata, PredictRequest, PredictResponse, PredictionPoint};

use crate::models::{ModelError, ModelManager};

const STEP: Duration = Duration::minutes(5);
const CONFIDENCE: f64 = 0.95;

/// Clamp every value to `>= 0`, additionally capping at `1.0` for metrics
/// whose name marks them as a utilization ratio.
fn clamp_all(values: Vec<f64>, is_utilization: bool) -> Vec<f64> {
    values
        .into_iter()
        .map(|v| if is_utilization { v.clamp(0.0, 1.0) } else { v.max(0.0) })
        .collect()
}

pub struct PredictorService {
    models: Arc<ModelManager>,
    cache_ttl: Duration,
    cache: DashMap<String, (DateTime<Utc>, PredictResponse)>,
}

impl PredictorService {
    #[must_use]
    pub fn new(models: Arc<ModelManager>, cache_ttl_seconds: u64) -> Self {
        Self {
            models,
            cache_ttl: Duration::seconds(cache_ttl_seconds as i64),
            cache: DashMap::new(),
        }
    }

    fn cache_key(metric: &str, periods: u32, model: &str) -> String {
        format!("{metric}:{periods}:{model}")
    }

    /// Resolve, cache, and return a forecast. Returns a fully-populated
    /// response, always; cache misses compute fresh, cache hits are returned
    /// verbatim with `metadata.cache_hit` flipped to `true`.
    ///
    /// An unknown or disabled model name (including a missing `prophet`)
    /// falls back to `baseline` per spec.md's predict contract; only when
    /// `baseline` itself is unavailable does this surface an error, and that
    /// error is [`ModelError::NotLoaded`] (503), not [`ModelError::Unknown`]
    /// (the caller didn't name an unknown model, the fallback chain is just
    /// empty).
    pub fn predict(&self, req: &PredictRequest) -> Result<PredictResponse, ModelError> {
        let requested_model = req.model.as_deref().unwrap_or_else(|| self.models.default_forecaster_name());
        let key = Self::cache_key(&req.metric, req.periods, requested_model);

        if let Some(entry) = self.cache.get(&key) {
            let (cached_at, response) = entry.value();
            if Utc::now() - *cached_at < self.cache_ttl {
                let mut hit = response.clone();
                hit.metadata.cache_hit = true;
                return Ok(hit);
            }
        }

        let (model_name, forecaster) = match self.models.forecaster(requested_model) {
            Ok(forecaster) => (requested_model.to_owned(), forecaster),
            Err(_) => {
                let fallback = self.models.forecaster("baseline").map_err(|_| ModelError::NotLoaded)?;
                ("baseline".to_owned(), fallback)
            }
        };
        let is_utilization = req.metric.contains("utilization");
        let values = clamp_all(forecaster.predict(&req.metric, req.periods), is_utilization);
        let (lower, upper) = if req.include_confidence {
            let (lo, hi) = forecaster.confidence_interval(&req.metric, req.periods, CONFIDENCE);
            (
                clamp_all(lo, is_utilization).into_iter().map(Some).collect(),
                clamp_all(hi, is_utilization).into_iter().map(Some).collect(),
            )
        } else {
            (vec![None; values.len()], vec![None; values.len()])
        };

        let generated_at = Utc::now();
        let predictions = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| PredictionPoint {
                timestamp: generated_at + STEP * (i as i32 + 1),
                value,
                lower: lower[i],
                upper: upper[i],
            })
            .collect();

        let response = PredictResponse {
            metric: req.metric.clone(),
            model: model_name,
            predictions,
            metadata: PredictMetadata {
                cache_hit: false,
                generated_at,
            },
        };

        self.cache.insert(key, (generated_at, response.clone()));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ModelConfig;

    use super::*;

    fn manager() -> Arc<ModelManager> {
        let mut m = ModelManager::new(&ModelConfig::default());
        m.load();
        Arc::new(m)
    }

    #[test]
    fn second_call_within_ttl_is_a_cache_hit() {
        let service = PredictorService::new(manager(), 300);
        let req = PredictRequest {
            metric: "cpu_utilization".to_owned(),
            periods: 3,
            model: None,
            include_confidence: false,
        };
        let first = service.predict(&req).unwrap();
        let second = service.predict(&req).unwrap();
        assert!(!first.metadata.cache_hit);
        assert!(second.metadata.cache_hit);
        let first_values: Vec<f64> = first.predictions.iter().map(|p| p.value).collect();
        let second_values: Vec<f64> = second.predictions.iter().map(|p| p.value).collect();
        assert_eq!(first_values, second_values);
    }

    #[test]
    fn utilization_metric_predictions_are_capped_at_one() {
        let manager = manager();
        manager.forecaster("baseline").unwrap().update("mem_utilization", 1.0);
        for _ in 0..12 {
            manager.forecaster("baseline").unwrap().update("mem_utilization", 0.99);
        }
        let service = PredictorService::new(manager, 300);
        let req = PredictRequest {
            metric: "mem_utilization".to_owned(),
            periods: 5,
            model: None,
            include_confidence: false,
        };
        let response = service.predict(&req).unwrap();
        assert!(response.predictions.iter().all(|p| p.value <= 1.0));
    }

    #[test]
    fn unknown_model_falls_back_to_baseline() {
        let service = PredictorService::new(manager(), 300);
        let req = PredictRequest {
            metric: "cpu_utilization".to_owned(),
            periods: 1,
            model: Some("unknown".to_owned()),
            include_confidence: false,
        };
        let response = service.predict(&req).expect("falls back to baseline instead of erroring");
        assert_eq!(response.model, "baseline");
    }

    #[test]
    fn disabled_model_falls_back_to_baseline() {
        let mut manager = ModelManager::new(&ModelConfig {
            models_dir: std::path::PathBuf::from("/nonexistent/path/for/test"),
            baseline_enabled: true,
            prophet_enabled: false,
            xgboost_enabled: false,
            cache_predictions: true,
            cache_ttl_seconds: 300,
        });
        manager.load();
        let service = PredictorService::new(Arc::new(manager), 300);
        let req = PredictRequest {
            metric: "cpu_utilization".to_owned(),
            periods: 1,
            model: Some("prophet".to_owned()),
            include_confidence: false,
        };
        let response = service.predict(&req).expect("disabled prophet falls back to baseline");
        assert_eq!(response.model, "baseline");
    }

    #[test]
    fn missing_baseline_is_not_ready_not_an_internal_error() {
        let mut manager = ModelManager::new(&ModelConfig {
            models_dir: std::path::PathBuf::from("/nonexistent/path/for/test"),
            baseline_enabled: false,
            prophet_enabled: false,
            xgboost_enabled: false,
            cache_predictions: true,
            cache_ttl_seconds: 300,
        });
        manager.load();
        let service = PredictorService::new(Arc::new(manager), 300);
        let req = PredictRequest {
            metric: "cpu_utilization".to_owned(),
            periods: 1,
            model: Some("anything".to_owned()),
            include_confidence: false,
        };
        assert!(matches!(service.predict(&req), Err(ModelError::NotLoaded)));
    }
}
