//! `tower`/`axum` middleware layers.

pub mod cors;
pub mod metrics;
