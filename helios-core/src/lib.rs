//! Shared data model and wire contracts for the Helios telemetry platform.
//!
//! This crate has no async runtime dependency and no I/O of its own: it is
//! the leaf of the workspace's dependency graph, imported by both
//! `helios-agent` and `helios-server`.

pub mod id;
pub mod model;
pub mod resource;
pub mod status;
pub mod wire;

pub use model::{
    Agent, AgentStatus, CollectionResult, Deployment, Environment, MetricSample, MetricType,
    ModelInfo, SourceConfig,
};
