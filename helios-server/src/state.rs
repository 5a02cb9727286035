//! Process-wide shared state threaded through axum's `State` extractor.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{config::InferenceConfig, metrics::Metrics, models::ModelManager, services, store::Store};

/// Everything a route handler needs: the registry/metrics store, the model
/// manager, the Prometheus instruments, and the two process-wide caches
/// (§5: prediction cache, recommender cooldown map).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub models: Arc<ModelManager>,
    pub metrics: Arc<Metrics>,
    pub config: Arc<InferenceConfig>,
    pub predictor: Arc<services::predictor::PredictorService>,
    pub anomaly: Arc<services::anomaly::AnomalyDetectorService>,
    pub recommender: Arc<services::recommender::RecommenderService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, models: Arc<ModelManager>, config: InferenceConfig) -> Self {
        let config = Arc::new(config);
        let metrics = Arc::new(Metrics::new(&config.metrics.prefix));
        let predictor = Arc::new(services::predictor::PredictorService::new(
            models.clone(),
            config.model.cache_ttl_seconds,
        ));
        let anomaly = Arc::new(services::anomaly::AnomalyDetectorService::new(models.clone(), config.anomaly.clone()));
        let recommender = Arc::new(services::recommender::RecommenderService::new(config.recommendation.clone()));
        Self {
            store,
            models,
            metrics,
            config,
            predictor,
            anomaly,
            recommender,
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}
