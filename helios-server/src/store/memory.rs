//! Pure in-process [`Store`] implementation, used when the SQLite backend
//! cannot be opened (e.g. read-only filesystem, missing directory).
//!
//! Mirrors `SqliteStore`'s semantics exactly — same status derivation, same
//! distinct-metric-name accounting for `Deployment::metrics_count` — but keeps
//! everything in `parking_lot`-guarded maps instead of a database file.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use helios_core::{
    id,
    model::{Agent, Deployment, MetricSample},
    status,
    wire::{
        CreateDeploymentRequest, HeartbeatRequest, MetricPoint, RegisterAgentRequest,
        UpdateAgentConfigRequest, UpdateDeploymentRequest,
    },
};
use parking_lot::RwLock;

use super::{AgentConfig, Store, StoreError};

#[derive(Clone, Debug)]
struct DeploymentRecord {
    id: String,
    name: String,
    description: String,
    environment: helios_core::model::Environment,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct AgentRecord {
    id: String,
    deployment_id: String,
    hostname: String,
    platform: String,
    agent_version: String,
    last_seen: chrono::DateTime<Utc>,
    registered_at: chrono::DateTime<Utc>,
    paused: bool,
    collection_interval: u32,
    metrics: Vec<String>,
    metrics_count: u64,
    location: Option<String>,
    region: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    ip_address: Option<String>,
}

impl AgentRecord {
    fn into_agent(self) -> Agent {
        let status = status::derive(Utc::now(), self.last_seen, self.paused);
        Agent {
            id: self.id,
            deployment_id: self.deployment_id,
            hostname: self.hostname,
            platform: self.platform,
            agent_version: self.agent_version,
            status,
            last_seen: self.last_seen,
            registered_at: self.registered_at,
            paused: self.paused,
            collection_interval: self.collection_interval,
            metrics: self.metrics,
            metrics_count: self.metrics_count,
            location: self.location,
            region: self.region,
            latitude: self.latitude,
            longitude: self.longitude,
            ip_address: self.ip_address,
        }
    }
}

#[derive(Default)]
struct Inner {
    deployments: BTreeMap<String, DeploymentRecord>,
    agents: BTreeMap<String, AgentRecord>,
    metrics: Vec<MetricPoint>,
}

/// Parking-lot-guarded in-process store. Used as the resilience fallback when
/// the embedded SQLite file cannot be opened at startup.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    max_points: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new(max_points: u64) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_points,
        }
    }

    fn deployment_view(inner: &Inner, record: &DeploymentRecord) -> Deployment {
        let now = Utc::now();
        let mut agents_count = 0u32;
        let mut agents_online = 0u32;
        let mut names = BTreeSet::new();
        for agent in inner.agents.values().filter(|a| a.deployment_id == record.id) {
            agents_count += 1;
            if status::derive(now, agent.last_seen, agent.paused) == helios_core::model::AgentStatus::Online {
                agents_online += 1;
            }
            names.extend(agent.metrics.iter().cloned());
        }
        Deployment {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            environment: record.environment,
            created_at: record.created_at,
            updated_at: record.updated_at,
            agents_count,
            agents_online,
            metrics_count: names.len() as u64,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_deployments(&self) -> Result<Vec<Deployment>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .deployments
            .values()
            .map(|r| Self::deployment_view(&inner, r))
            .collect())
    }

    async fn get_deployment(&self, id: &str) -> Result<Option<Deployment>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.deployments.get(id).map(|r| Self::deployment_view(&inner, r)))
    }

    async fn create_deployment(&self, req: CreateDeploymentRequest) -> Result<Deployment, StoreError> {
        let mut inner = self.inner.write();
        if inner.deployments.values().any(|d| d.name == req.name) {
            return Err(StoreError::DuplicateName(req.name));
        }
        let now = Utc::now();
        let record = DeploymentRecord {
            id: id::deployment_id(),
            name: req.name,
            description: req.description,
            environment: req.environment,
            created_at: now,
            updated_at: now,
        };
        inner.deployments.insert(record.id.clone(), record.clone());
        Ok(Self::deployment_view(&inner, &record))
    }

    async fn update_deployment(
        &self,
        id: &str,
        req: UpdateDeploymentRequest,
    ) -> Result<Option<Deployment>, StoreError> {
        let mut inner = self.inner.write();
        if let Some(name) = &req.name {
            if inner.deployments.values().any(|d| &d.name == name && d.id != id) {
                return Err(StoreError::DuplicateName(name.clone()));
            }
        }
        if !inner.deployments.contains_key(id) {
            return Ok(None);
        }
        {
            let record = inner.deployments.get_mut(id).expect("checked above");
            if let Some(name) = req.name {
                record.name = name;
            }
            if let Some(description) = req.description {
                record.description = description;
            }
            if let Some(environment) = req.environment {
                record.environment = environment;
            }
            record.updated_at = Utc::now();
        }
        let record = inner.deployments.get(id).expect("checked above").clone();
        Ok(Some(Self::deployment_view(&inner, &record)))
    }

    async fn delete_deployment(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        let removed = inner.deployments.remove(id).is_some();
        if removed {
            inner.agents.retain(|_, a| a.deployment_id != id);
        }
        Ok(removed)
    }

    async fn list_agents(&self, deployment_id: Option<&str>) -> Result<Vec<Agent>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .agents
            .values()
            .filter(|a| deployment_id.map_or(true, |dep| a.deployment_id == dep))
            .cloned()
            .map(AgentRecord::into_agent)
            .collect())
    }

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.agents.get(id).cloned().map(AgentRecord::into_agent))
    }

    async fn register_agent(
        &self,
        deployment_id: &str,
        req: RegisterAgentRequest,
    ) -> Result<Agent, StoreError> {
        let mut inner = self.inner.write();
        if !inner.deployments.contains_key(deployment_id) {
            let now = Utc::now();
            inner.deployments.insert(
                deployment_id.to_owned(),
                DeploymentRecord {
                    id: deployment_id.to_owned(),
                    name: deployment_id.to_owned(),
                    description: "Auto-created deployment".to_owned(),
                    environment: helios_core::model::Environment::Development,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        let agent_id = req.agent_id.clone().unwrap_or_else(|| id::agent_id(&req.hostname));
        let now = Utc::now();
        let metrics_count = req.metrics.len() as u64;
        let record = if let Some(existing) = inner.agents.get(&agent_id).cloned() {
            AgentRecord {
                hostname: req.hostname,
                platform: req.platform,
                agent_version: req.agent_version,
                last_seen: now,
                metrics: req.metrics,
                metrics_count,
                location: req.location,
                region: req.region,
                latitude: req.latitude,
                longitude: req.longitude,
                ip_address: req.ip_address,
                ..existing
            }
        } else {
            AgentRecord {
                id: agent_id.clone(),
                deployment_id: deployment_id.to_owned(),
                hostname: req.hostname,
                platform: req.platform,
                agent_version: req.agent_version,
                last_seen: now,
                registered_at: now,
                paused: false,
                collection_interval: 15,
                metrics: req.metrics,
                metrics_count,
                location: req.location,
                region: req.region,
                latitude: req.latitude,
                longitude: req.longitude,
                ip_address: req.ip_address,
            }
        };
        inner.agents.insert(agent_id, record.clone());
        Ok(record.into_agent())
    }

    async fn heartbeat_agent(&self, id: &str, req: HeartbeatRequest) -> Result<Option<Agent>, StoreError> {
        let mut inner = self.inner.write();
        let Some(record) = inner.agents.get_mut(id) else {
            return Ok(None);
        };
        record.last_seen = Utc::now();
        if !req.metrics.is_empty() {
            record.metrics_count = req.metrics.len() as u64;
            record.metrics = req.metrics;
        }
        Ok(Some(record.clone().into_agent()))
    }

    async fn update_agent_config(
        &self,
        id: &str,
        req: UpdateAgentConfigRequest,
    ) -> Result<Option<Agent>, StoreError> {
        let mut inner = self.inner.write();
        let Some(record) = inner.agents.get_mut(id) else {
            return Ok(None);
        };
        if let Some(paused) = req.paused {
            record.paused = paused;
        }
        if let Some(interval) = req.collection_interval {
            record.collection_interval = interval;
        }
        Ok(Some(record.clone().into_agent()))
    }

    async fn get_agent_config(&self, id: &str) -> Result<Option<AgentConfig>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.agents.get(id).map(|r| AgentConfig {
            paused: r.paused,
            collection_interval: r.collection_interval,
        }))
    }

    async fn delete_agent(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        Ok(inner.agents.remove(id).is_some())
    }

    async fn get_deployment_metric_names(&self, deployment_id: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read();
        let mut names = BTreeSet::new();
        for agent in inner.agents.values().filter(|a| a.deployment_id == deployment_id) {
            names.extend(agent.metrics.iter().cloned());
        }
        Ok(names.into_iter().collect())
    }

    async fn add_metrics(&self, samples: &[MetricSample]) -> Result<usize, StoreError> {
        let mut inner = self.inner.write();
        for sample in samples {
            inner.metrics.push(MetricPoint {
                name: sample.name.clone(),
                value: sample.value,
                timestamp: sample.timestamp,
                labels: sample.labels.clone(),
            });
        }
        let max_points = self.max_points as usize;
        if inner.metrics.len() > max_points {
            inner.metrics.sort_by_key(|p| p.timestamp);
            let excess = inner.metrics.len() - max_points;
            inner.metrics.drain(0..excess);
        }
        Ok(samples.len())
    }

    async fn get_metrics(
        &self,
        name: &str,
        deployment: Option<&str>,
        hours: i64,
        limit: usize,
    ) -> Result<Vec<MetricPoint>, StoreError> {
        let inner = self.inner.read();
        let cutoff = Utc::now() - chrono::Duration::hours(hours);
        let mut out: Vec<MetricPoint> = inner
            .metrics
            .iter()
            .filter(|p| p.name == name && p.timestamp > cutoff)
            .filter(|p| deployment.map_or(true, |dep| p.labels.get("deployment").map(String::as_str) == Some(dep)))
            .cloned()
            .collect();
        out.sort_by_key(|p| p.timestamp);
        out.truncate(limit);
        Ok(out)
    }

    async fn get_latest(&self, name: &str, deployment: Option<&str>) -> Result<Option<MetricPoint>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .metrics
            .iter()
            .filter(|p| p.name == name)
            .filter(|p| deployment.map_or(true, |dep| p.labels.get("deployment").map(String::as_str) == Some(dep)))
            .max_by_key(|p| p.timestamp)
            .cloned())
    }

    async fn get_metric_names(&self, deployment: Option<&str>) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read();
        let names: BTreeSet<String> = inner
            .metrics
            .iter()
            .filter(|p| deployment.map_or(true, |dep| p.labels.get("deployment").map(String::as_str) == Some(dep)))
            .map(|p| p.name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_core::model::Environment;

    #[tokio::test]
    async fn create_and_list_roundtrip() {
        let store = MemoryStore::new(1000);
        let dep = store
            .create_deployment(CreateDeploymentRequest {
                name: "edge".to_owned(),
                description: String::new(),
                environment: Environment::Staging,
            })
            .await
            .unwrap();
        assert_eq!(store.list_deployments().await.unwrap().len(), 1);
        assert_eq!(dep.environment, Environment::Staging);
    }

    #[tokio::test]
    async fn register_auto_creates_deployment() {
        let store = MemoryStore::new(1000);
        let agent = store
            .register_agent(
                "auto01",
                RegisterAgentRequest {
                    hostname: "node-1".to_owned(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(agent.deployment_id, "auto01");
        assert!(store.get_deployment("auto01").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn metrics_trim_keeps_max_points() {
        let store = MemoryStore::new(3);
        let samples: Vec<MetricSample> = (0..5)
            .map(|i| MetricSample {
                name: "mem_usage".to_owned(),
                value: f64::from(i),
                timestamp: Utc::now() + chrono::Duration::seconds(i),
                kind: helios_core::model::MetricType::Gauge,
                labels: Default::default(),
                source: "test".to_owned(),
            })
            .collect();
        store.add_metrics(&samples).await.unwrap();
        let points = store.get_metrics("mem_usage", None, 24, 100).await.unwrap();
        assert_eq!(points.len(), 3);
    }
}
