//! Anomaly scoring over user-supplied time series.
//!
//! Ported from `original_source/ml/inference/anomaly_detector.py::AnomalyDetectorService.detect`:
//! for each metric, compute mean/std fresh over the full series on every
//! request and z-score each point against those, flag points over
//! threshold, bucket by severity. The mean/std are deliberately *not*
//! reused across requests — `_detect_metric_anomalies` in the original
//! recomputes them every call, since the same metric name can carry a
//! different series from one request to the next.

use std::{collections::BTreeMap, sync::Arc};

use helios_core::wire::{Anomaly, DetectRequest, DetectResponse, DetectSummary, Severity};

use crate::{config::AnomalyConfig, models::ModelManager};

pub struct AnomalyDetectorService {
    models: Arc<ModelManager>,
    config: AnomalyConfig,
}

impl AnomalyDetectorService {
    #[must_use]
    pub fn new(models: Arc<ModelManager>, config: AnomalyConfig) -> Self {
        Self { models, config }
    }

    /// Bucket a score that has already passed `threshold_sigma` into a
    /// severity. Anything below `severity_low` still falls through to
    /// `Low` — there is no further gate below the threshold check itself.
    fn severity(&self, score: f64) -> Severity {
        if score >= self.config.severity_critical {
            Severity::Critical
        } else if score >= self.config.severity_high {
            Severity::High
        } else if score >= self.config.severity_medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Score every series in `req.metrics`, skipping any shorter than
    /// `min_data_points`. Mean and standard deviation are computed fresh
    /// over the full series on every call — never cached across requests,
    /// since the same metric name can arrive with an unrelated series next
    /// time. Always succeeds: if no anomaly model is loaded at all, returns
    /// an empty, healthy response rather than erroring.
    #[must_use]
    pub fn detect(&self, req: &DetectRequest) -> DetectResponse {
        let Some(_xgboost) = self.models.xgboost() else {
            return DetectResponse {
                anomalies: Vec::new(),
                summary: DetectSummary {
                    status: "healthy".to_owned(),
                    anomaly_rate: 0.0,
                    by_severity: BTreeMap::new(),
                    by_metric: BTreeMap::new(),
                    max_score: 0.0,
                },
            };
        };

        let mut anomalies = Vec::new();
        let mut total_points = 0usize;

        for (metric, points) in &req.metrics {
            if points.len() < self.config.min_data_points {
                continue;
            }
            total_points += points.len();

            let values: Vec<f64> = points.iter().map(|p| p.value).collect();
            let expected = mean(&values);
            let sigma = std_dev(&values, expected).max(1e-3);

            for (index, point) in points.iter().enumerate() {
                let score = (point.value - expected).abs() / sigma;
                if score <= req.threshold_sigma {
                    continue;
                }
                let severity = self.severity(score);
                anomalies.push(Anomaly {
                    metric: metric.clone(),
                    index,
                    timestamp: point.timestamp,
                    value: point.value,
                    score,
                    expected,
                    severity,
                    description: format!("{metric} deviated {score:.2} sigma from its recent baseline"),
                });
            }
        }

        let anomaly_rate = if total_points == 0 { 0.0 } else { anomalies.len() as f64 / total_points as f64 };
        let max_score = anomalies.iter().map(|a| a.score).fold(0.0, f64::max);

        let mut by_severity = BTreeMap::new();
        let mut by_metric = BTreeMap::new();
        for anomaly in &anomalies {
            *by_severity.entry(anomaly.severity.as_str().to_owned()).or_insert(0usize) += 1;
            *by_metric.entry(anomaly.metric.clone()).or_insert(0usize) += 1;
        }

        let status = if anomalies.iter().any(|a| a.severity == Severity::Critical) {
            "critical"
        } else if anomalies.iter().any(|a| a.severity == Severity::High) {
            "warning"
        } else if !anomalies.is_empty() {
            "attention"
        } else {
            "healthy"
        };

        DetectResponse {
            anomalies,
            summary: DetectSummary {
                status: status.to_owned(),
                anomaly_rate,
                by_severity,
                by_metric,
                max_score,
            },
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use helios_core::wire::DataPoint;

    use crate::config::ModelConfig;
    use crate::models::ModelManager;

    use super::*;

    #[test]
    fn single_spike_among_steady_points_is_flagged_critical() {
        let mut manager = ModelManager::new(&ModelConfig::default());
        manager.load();
        let service = AnomalyDetectorService::new(Arc::new(manager), AnomalyConfig::default());

        let now = Utc::now();
        let mut points: Vec<DataPoint> = (0..20)
            .map(|i| DataPoint {
                timestamp: now + chrono::Duration::minutes(i),
                value: 0.15 + if i % 2 == 0 { 0.02 } else { -0.02 },
            })
            .collect();
        points.push(DataPoint { timestamp: now + chrono::Duration::minutes(20), value: 0.95 });

        let mut metrics = BTreeMap::new();
        metrics.insert("cpu_utilization".to_owned(), points);
        let req = DetectRequest { metrics, threshold_sigma: 2.5 };

        let response = service.detect(&req);
        assert_eq!(response.anomalies.len(), 1);
        assert_eq!(response.anomalies[0].severity, Severity::Critical);
        assert_eq!(response.summary.status, "critical");
    }

    #[test]
    fn repeated_metric_name_does_not_leak_stats_across_requests() {
        let mut manager = ModelManager::new(&ModelConfig::default());
        manager.load();
        let service = AnomalyDetectorService::new(Arc::new(manager), AnomalyConfig::default());
        let now = Utc::now();

        let low_points: Vec<DataPoint> = (0..20)
            .map(|i| DataPoint {
                timestamp: now + chrono::Duration::minutes(i),
                value: 0.15 + if i % 2 == 0 { 0.01 } else { -0.01 },
            })
            .collect();
        let mut low_metrics = BTreeMap::new();
        low_metrics.insert("cpu_utilization".to_owned(), low_points);
        let first = service.detect(&DetectRequest { metrics: low_metrics, threshold_sigma: 2.5 });
        assert!(first.anomalies.is_empty());

        let high_points: Vec<DataPoint> = (0..20)
            .map(|i| DataPoint {
                timestamp: now + chrono::Duration::minutes(i),
                value: 0.90 + if i % 2 == 0 { 0.01 } else { -0.01 },
            })
            .collect();
        let mut high_metrics = BTreeMap::new();
        high_metrics.insert("cpu_utilization".to_owned(), high_points);
        let second = service.detect(&DetectRequest { metrics: high_metrics, threshold_sigma: 2.5 });
        assert!(
            second.anomalies.is_empty(),
            "second request's own steady series must not be scored against the first request's statistics"
        );
    }

    #[test]
    fn series_shorter_than_min_points_is_skipped() {
        let mut manager = ModelManager::new(&ModelConfig::default());
        manager.load();
        let service = AnomalyDetectorService::new(Arc::new(manager), AnomalyConfig::default());

        let now = Utc::now();
        let points: Vec<DataPoint> = (0..5).map(|i| DataPoint { timestamp: now, value: f64::from(i) }).collect();
        let mut metrics = BTreeMap::new();
        metrics.insert("short".to_owned(), points);
        let req = DetectRequest { metrics, threshold_sigma: 2.5 };

        assert!(service.detect(&req).anomalies.is_empty());
    }
}
