//! Helios inference server: ingest pipeline, deployment/agent registry, and
//! model-backed predict/detect/recommend endpoints.
//!
//! Organized leaves-first: [`store`] holds the persistence layer, [`models`]
//! the pluggable forecast/anomaly model manager, [`services`] the domain
//! logic sitting atop the model manager, [`ingest`] the agent-facing ingest
//! pipeline, and [`routes`] the axum wiring tying all of it to the REST
//! surface described in the project's external interface contract.
#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths, unreachable_pub)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod layers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod services;
pub mod signal;
pub mod state;
pub mod store;

pub use crate::{config::InferenceConfig, state::AppState};
