//! Prophet-slot forecaster.
//!
//! `original_source/ml/inference/model_manager.py::_load_prophet` has no
//! in-memory fallback at all — a missing `prophet_model.joblib` just means
//! the slot never loads. spec.md's fallback-always-succeeds guarantee
//! overrides that for Helios (see `models::mod`'s doc comment and DESIGN.md),
//! so this slot is served by the same moving-average/trend model as
//! [`super::baseline::BaselineForecaster`] — there being no portable way to
//! execute an actual Prophet model here regardless of artifact presence.

use super::{baseline::BaselineForecaster, Forecaster};

pub struct ProphetForecaster {
    inner: BaselineForecaster,
}

impl ProphetForecaster {
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            inner: BaselineForecaster::new(window),
        }
    }
}

impl Forecaster for ProphetForecaster {
    fn update(&self, metric: &str, value: f64) {
        self.inner.update(metric, value);
    }

    fn predict(&self, metric: &str, periods: u32) -> Vec<f64> {
        self.inner.predict(metric, periods)
    }

    fn confidence_interval(&self, metric: &str, periods: u32, confidence: f64) -> (Vec<f64>, Vec<f64>) {
        self.inner.confidence_interval(metric, periods, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_predictions_with_no_artifact() {
        let model = ProphetForecaster::new(2);
        model.update("mem_usage", 0.5);
        model.update("mem_usage", 0.5);
        let predictions = model.predict("mem_usage", 4);
        assert_eq!(predictions.len(), 4);
    }
}
