//! Domain services sitting atop the model manager: prediction caching,
//! anomaly scoring, and scaling recommendations.
//!
//! Grounded in the flat `original_source/ml/inference/` package
//! (`predictor.py`, `anomaly_detector.py`, `recommender.py`), reworked around
//! the same [`crate::models::ModelManager`] trait objects the route handlers
//! already depend on.

pub mod anomaly;
pub mod predictor;
pub mod recommender;
