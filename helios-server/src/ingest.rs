//! Agent-facing ingest pipeline: `POST /api/v1/ingest`.
//!
//! `original_source` has no standalone ingest-route module to port from —
//! the kept pack's `ml/inference/` package is the ML service only, and its
//! `app.py` is a route-free stub. This pipeline is assembled from spec.md's
//! own ingest contract (§4.4), calling into `register_agent`/`add_metrics`
//! the way `original_source/ml/inference/storage/sqlite_backend.py` defines
//! them: store the batch, auto-register (or refresh) the sending agent from
//! its first sample's labels, and echo back any pending server-driven
//! commands.

use std::collections::BTreeSet;

use helios_core::{id, model::MetricSample, wire::{Commands, IngestRequest, IngestResponse, RegisterAgentRequest}};
use thiserror::Error;

use crate::store::{Store, StoreError};

const DEFAULT_COLLECTION_INTERVAL: u32 = 15;

/// Error surfaced by the ingest pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The request body failed validation (empty batch, missing `deployment` label).
    #[error("{0}")]
    InvalidBody(String),
    /// Persistence-layer failure while storing metrics or updating the registry.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn sample_labels_deployment(samples: &[MetricSample]) -> Option<&str> {
    samples.first()?.labels.get("deployment").map(String::as_str)
}

/// Run one ingest batch: persist the samples, auto-register/refresh the
/// sending agent, and assemble any pending server-driven commands.
pub async fn ingest(store: &dyn Store, req: IngestRequest) -> Result<IngestResponse, IngestError> {
    if req.metrics.is_empty() {
        return Err(IngestError::InvalidBody("ingest payload must contain at least one metric sample".to_owned()));
    }
    let Some(deployment) = sample_labels_deployment(&req.metrics) else {
        return Err(IngestError::InvalidBody("metric samples must carry a 'deployment' label".to_owned()));
    };
    let deployment = deployment.to_owned();

    let first = &req.metrics[0];
    let hostname = first
        .labels
        .get("host")
        .or_else(|| first.labels.get("hostname"))
        .cloned()
        .unwrap_or_else(|| "unknown".to_owned());
    let platform = first.labels.get("platform").cloned().unwrap_or_else(|| std::env::consts::OS.to_owned());

    let metric_names: Vec<String> = req.metrics.iter().map(|s| s.name.clone()).collect::<BTreeSet<_>>().into_iter().collect();
    let agent_id = id::auto_register_agent_id(&hostname, &deployment);

    let received = store.add_metrics(&req.metrics).await?;

    store
        .register_agent(
            &deployment,
            RegisterAgentRequest {
                agent_id: Some(agent_id.clone()),
                hostname,
                platform,
                agent_version: req.agent_version,
                metrics: metric_names,
                ..Default::default()
            },
        )
        .await?;

    let commands = store.get_agent_config(&agent_id).await?.and_then(|cfg| {
        let commands = Commands {
            paused: cfg.paused.then_some(true),
            collection_interval: (cfg.collection_interval != DEFAULT_COLLECTION_INTERVAL).then_some(cfg.collection_interval),
        };
        (!commands.is_empty()).then_some(commands)
    });

    Ok(IngestResponse { received, commands })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use helios_core::model::MetricType;

    use crate::store::memory::MemoryStore;

    use super::*;

    fn sample(deployment: &str) -> MetricSample {
        let labels = maplit::btreemap! {
            "deployment".to_owned() => deployment.to_owned(),
            "host".to_owned() => "node-1".to_owned(),
        };
        MetricSample {
            name: "cpu_utilization".to_owned(),
            value: 0.5,
            timestamp: Utc::now(),
            kind: MetricType::Gauge,
            labels,
            source: "system".to_owned(),
        }
    }

    #[tokio::test]
    async fn ingest_registers_agent_and_stores_metrics() {
        let store = MemoryStore::new(1000);
        let req = IngestRequest { metrics: vec![sample("prod01")], agent_version: "0.1.0".to_owned(), sent_at: Utc::now() };
        let response = ingest(&store, req).await.unwrap();
        assert_eq!(response.received, 1);
        assert!(response.commands.is_none());
        assert!(store.get_agent("node-1-prod").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let store = MemoryStore::new(1000);
        let req = IngestRequest { metrics: vec![], agent_version: "0.1.0".to_owned(), sent_at: Utc::now() };
        assert!(matches!(ingest(&store, req).await, Err(IngestError::InvalidBody(_))));
    }

    #[tokio::test]
    async fn paused_agent_is_echoed_back_as_a_command() {
        let store = MemoryStore::new(1000);
        let req = IngestRequest { metrics: vec![sample("prod01")], agent_version: "0.1.0".to_owned(), sent_at: Utc::now() };
        ingest(&store, req).await.unwrap();
        store
            .update_agent_config("node-1-prod", helios_core::wire::UpdateAgentConfigRequest { paused: Some(true), collection_interval: None })
            .await
            .unwrap();

        let req2 = IngestRequest { metrics: vec![sample("prod01")], agent_version: "0.1.0".to_owned(), sent_at: Utc::now() };
        let response = ingest(&store, req2).await.unwrap();
        let commands = response.commands.expect("paused agent should get a command back");
        assert_eq!(commands.paused, Some(true));
    }
}
