//! Moving-average baseline forecaster.
//!
//! Ported from `original_source/ml/inference/model_manager.py::InMemoryBaseline`:
//! a rolling window moving average plus a trend term derived from the
//! window-over-window delta, projected linearly forward.

use dashmap::DashMap;

use super::Forecaster;

const HISTORY_CAP: usize = 1000;

/// Window-based moving-average forecaster, shared by the trained-artifact and
/// in-memory code paths (see `models::probe_artifact`): the same arithmetic
/// runs either way, since there is no trained artifact to execute.
pub struct BaselineForecaster {
    window: usize,
    history: DashMap<String, Vec<f64>>,
}

impl BaselineForecaster {
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            window,
            history: DashMap::new(),
        }
    }

    fn moving_average_and_trend(&self, metric: &str) -> Option<(f64, f64)> {
        let history = self.history.get(metric)?;
        if history.len() < self.window {
            return None;
        }
        let tail = &history[history.len() - self.window..];
        let ma = tail.iter().sum::<f64>() / self.window as f64;
        let trend = if history.len() >= self.window * 2 {
            let prev_tail = &history[history.len() - self.window * 2..history.len() - self.window];
            let prev_ma = prev_tail.iter().sum::<f64>() / self.window as f64;
            (ma - prev_ma) / self.window as f64
        } else {
            0.0
        };
        Some((ma, trend))
    }

    fn std_dev(&self, metric: &str) -> Option<f64> {
        let history = self.history.get(metric)?;
        if history.len() < self.window {
            return None;
        }
        let tail = &history[history.len() - self.window..];
        let mean = tail.iter().sum::<f64>() / tail.len() as f64;
        let variance = tail.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / tail.len() as f64;
        Some(variance.sqrt())
    }
}

impl Forecaster for BaselineForecaster {
    fn update(&self, metric: &str, value: f64) {
        let mut entry = self.history.entry(metric.to_owned()).or_default();
        entry.push(value);
        let len = entry.len();
        if len > HISTORY_CAP {
            entry.drain(0..len - HISTORY_CAP);
        }
    }

    fn predict(&self, metric: &str, periods: u32) -> Vec<f64> {
        match self.moving_average_and_trend(metric) {
            Some((ma, trend)) => (1..=periods).map(|i| (ma + trend * f64::from(i)).max(0.0)).collect(),
            None => {
                let last = self
                    .history
                    .get(metric)
                    .and_then(|h| h.last().copied())
                    .unwrap_or(0.0);
                vec![last; periods as usize]
            }
        }
    }

    fn confidence_interval(&self, metric: &str, periods: u32, confidence: f64) -> (Vec<f64>, Vec<f64>) {
        let predictions = self.predict(metric, periods);
        let Some(std) = self.std_dev(metric) else {
            return (vec![0.0; periods as usize], vec![1.0; periods as usize]);
        };
        let z = if (confidence - 0.95).abs() < f64::EPSILON { 1.96 } else { 2.576 };
        let lower = predictions.iter().map(|p| (p - z * std).max(0.0)).collect();
        let upper = predictions.iter().map(|p| p + z * std).collect();
        (lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_prediction_before_window_fills() {
        let model = BaselineForecaster::new(12);
        model.update("cpu_utilization", 0.42);
        assert_eq!(model.predict("cpu_utilization", 3), vec![0.42, 0.42, 0.42]);
    }

    #[test]
    fn trend_extrapolates_linearly() {
        let model = BaselineForecaster::new(3);
        for v in [1.0, 1.0, 1.0, 2.0, 2.0, 2.0] {
            model.update("latency_ms", v);
        }
        let predictions = model.predict("latency_ms", 2);
        assert!(predictions[0] > 2.0);
        assert!(predictions[1] > predictions[0]);
    }

    #[test]
    fn confidence_interval_widens_with_observed_spread() {
        let model = BaselineForecaster::new(4);
        for v in [0.1, 0.9, 0.1, 0.9] {
            model.update("jitter", v);
        }
        let (lower, upper) = model.confidence_interval("jitter", 1, 0.95);
        assert!(lower[0] < upper[0]);
    }
}
