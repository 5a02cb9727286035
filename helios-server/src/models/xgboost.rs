//! z-score anomaly scorer.
//!
//! Ported from `original_source/ml/inference/model_manager.py::InMemoryAnomalyDetector`
//! (and `TrainedAnomalyDetector`'s own z-score fallback branch, taken when its
//! Isolation Forest model is absent) — mean/std per metric, score is
//! `|value - mean| / std`. No Isolation Forest crate is in the dependency
//! set, so the trained and fallback paths share this one scorer; only
//! `ModelInfo::is_fallback` distinguishes them (see `models::mod`).

use dashmap::DashMap;

use super::AnomalyModel;

#[derive(Clone, Copy)]
struct Stats {
    mean: f64,
    std: f64,
}

pub struct XgboostAnomalyModel {
    default_threshold_sigma: f64,
    stats: DashMap<String, Stats>,
}

impl XgboostAnomalyModel {
    #[must_use]
    pub fn new(default_threshold_sigma: f64) -> Self {
        Self {
            default_threshold_sigma,
            stats: DashMap::new(),
        }
    }

    #[must_use]
    pub fn is_anomaly(&self, metric: &str, value: f64, threshold_sigma: f64) -> bool {
        self.score(metric, value) > threshold_sigma
    }

    #[must_use]
    pub fn default_threshold_sigma(&self) -> f64 {
        self.default_threshold_sigma
    }

    /// Auto-fit on the leading 80% of `values` if `metric` has no statistics
    /// yet and there are more than 10 points — mirrors
    /// `InMemoryAnomalyDetector.detect`'s auto-fit-on-first-use behavior.
    pub fn auto_fit(&self, metric: &str, values: &[f64]) {
        if self.stats.contains_key(metric) || values.len() <= 10 {
            return;
        }
        let fit_size = (values.len() as f64 * 0.8) as usize;
        self.fit(metric, &values[..fit_size]);
    }
}

impl AnomalyModel for XgboostAnomalyModel {
    fn fit(&self, metric: &str, values: &[f64]) {
        if values.len() < 2 {
            let mean = values.first().copied().unwrap_or(0.0);
            self.stats.insert(metric.to_owned(), Stats { mean, std: 0.1 });
            return;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        let std = variance.sqrt().max(1e-3);
        self.stats.insert(metric.to_owned(), Stats { mean, std });
    }

    fn score(&self, metric: &str, value: f64) -> f64 {
        let Stats { mean, std } = self.stats.get(metric).map(|s| *s).unwrap_or(Stats { mean: 0.0, std: 1.0 });
        (value - mean).abs() / std
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfitted_metric_uses_neutral_stats() {
        let model = XgboostAnomalyModel::new(2.5);
        assert!((model.score("unknown", 3.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn fitted_metric_flags_outliers() {
        let model = XgboostAnomalyModel::new(2.5);
        model.fit("cpu_utilization", &[0.5, 0.5, 0.5, 0.5, 0.5, 0.5]);
        assert!(!model.is_anomaly("cpu_utilization", 0.5, 2.5));
        assert!(model.is_anomaly("cpu_utilization", 50.0, 2.5));
    }

    #[test]
    fn auto_fit_only_triggers_once_per_metric() {
        let model = XgboostAnomalyModel::new(2.5);
        let values: Vec<f64> = (0..20).map(f64::from).collect();
        model.auto_fit("ramp", &values);
        let score_before = model.score("ramp", 100.0);
        model.auto_fit("ramp", &[1.0, 1.0, 1.0]);
        assert_eq!(model.score("ramp", 100.0), score_before);
    }
}
