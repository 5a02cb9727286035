//! SQLite-backed [`Store`] implementation.
//!
//! Grounded in `original_source/ml/inference/storage/sqlite_backend.py`:
//! same schema, same WAL/foreign-key pragmas, same cascade-by-hand delete.
//! Blocking `rusqlite` calls run on `spawn_blocking` since axum handlers are
//! async; the connection pool (`r2d2` + `r2d2_sqlite`) bounds how many
//! blocking threads can hold a SQLite handle at once.

use std::{collections::BTreeSet, path::Path};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use helios_core::{
    id,
    model::{Agent, AgentStatus, Deployment, Environment, MetricSample},
    status,
    wire::{
        CreateDeploymentRequest, HeartbeatRequest, MetricPoint, RegisterAgentRequest,
        UpdateAgentConfigRequest, UpdateDeploymentRequest,
    },
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{AgentConfig, Store, StoreError};

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    max_points: u64,
}

fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS deployments (
            id TEXT PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            description TEXT DEFAULT '',
            environment TEXT DEFAULT 'development',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS agents (
            id TEXT PRIMARY KEY,
            deployment_id TEXT NOT NULL,
            hostname TEXT NOT NULL,
            platform TEXT DEFAULT 'unknown',
            agent_version TEXT DEFAULT 'unknown',
            last_seen TEXT NOT NULL,
            registered_at TEXT NOT NULL,
            paused INTEGER DEFAULT 0,
            collection_interval INTEGER DEFAULT 15,
            metrics TEXT DEFAULT '[]',
            metrics_count INTEGER DEFAULT 0,
            location TEXT,
            region TEXT,
            latitude REAL,
            longitude REAL,
            ip_address TEXT,
            FOREIGN KEY (deployment_id) REFERENCES deployments(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_agents_deployment ON agents(deployment_id);

        CREATE TABLE IF NOT EXISTS metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            value REAL NOT NULL,
            timestamp TEXT NOT NULL,
            labels TEXT DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_metrics_name ON metrics(name);
        CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON metrics(timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_metrics_name_ts ON metrics(name, timestamp DESC);
        ",
    )
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_agent(row: &Row<'_>) -> rusqlite::Result<Agent> {
    let last_seen = parse_ts(&row.get::<_, String>("last_seen")?);
    let paused: i64 = row.get("paused")?;
    let paused = paused != 0;
    let metrics_json: String = row.get("metrics")?;
    let metrics: Vec<String> = serde_json::from_str(&metrics_json).unwrap_or_default();
    Ok(Agent {
        id: row.get("id")?,
        deployment_id: row.get("deployment_id")?,
        hostname: row.get("hostname")?,
        platform: row.get("platform")?,
        agent_version: row.get("agent_version")?,
        status: status::derive(Utc::now(), last_seen, paused),
        last_seen,
        registered_at: parse_ts(&row.get::<_, String>("registered_at")?),
        paused,
        collection_interval: row.get::<_, i64>("collection_interval")? as u32,
        metrics,
        metrics_count: row.get::<_, i64>("metrics_count")? as u64,
        location: row.get("location")?,
        region: row.get("region")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        ip_address: row.get("ip_address")?,
    })
}

fn deployment_metrics_count(conn: &Connection, deployment_id: &str) -> rusqlite::Result<u64> {
    let mut stmt = conn.prepare("SELECT metrics FROM agents WHERE deployment_id = ?1")?;
    let mut names = BTreeSet::new();
    let rows = stmt.query_map(params![deployment_id], |r| r.get::<_, String>(0))?;
    for row in rows {
        let raw = row?;
        if let Ok(list) = serde_json::from_str::<Vec<String>>(&raw) {
            names.extend(list);
        }
    }
    Ok(names.len() as u64)
}

fn row_to_deployment(conn: &Connection, row: &Row<'_>) -> rusqlite::Result<Deployment> {
    let id: String = row.get("id")?;
    let agents_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM agents WHERE deployment_id = ?1",
        params![id],
        |r| r.get(0),
    )?;
    let environment_raw: String = row.get("environment")?;
    let env = match environment_raw.as_str() {
        "staging" => Environment::Staging,
        "production" => Environment::Production,
        _ => Environment::Development,
    };
    let now = Utc::now();
    let agents_online: i64 = {
        let mut stmt = conn.prepare("SELECT last_seen, paused FROM agents WHERE deployment_id = ?1")?;
        let mut count = 0;
        let rows = stmt.query_map(params![id], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (last_seen, paused) = row?;
            if status::derive(now, parse_ts(&last_seen), paused != 0) == AgentStatus::Online {
                count += 1;
            }
        }
        count
    };
    Ok(Deployment {
        id: id.clone(),
        name: row.get("name")?,
        description: row.get("description")?,
        environment: env,
        created_at: parse_ts(&row.get::<_, String>("created_at")?),
        updated_at: parse_ts(&row.get::<_, String>("updated_at")?),
        agents_count: agents_count as u32,
        agents_online: agents_online as u32,
        metrics_count: deployment_metrics_count(conn, &id)?,
    })
}

impl SqliteStore {
    pub fn open(path: &Path, max_points: u64) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        });
        let pool = Pool::builder().build(manager)?;
        let conn = pool.get()?;
        init_schema(&conn).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "sqlite store opened");
        Ok(Self { pool, max_points })
    }

    fn trim_metrics(conn: &Connection, max_points: u64) -> rusqlite::Result<()> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM metrics", [], |r| r.get(0))?;
        let max_points = max_points as i64;
        if count > max_points {
            let excess = count - max_points;
            conn.execute(
                "DELETE FROM metrics WHERE id IN (SELECT id FROM metrics ORDER BY timestamp ASC LIMIT ?1)",
                params![excess],
            )?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_deployments(&self) -> Result<Vec<Deployment>, StoreError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Deployment>, StoreError> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM deployments ORDER BY created_at")?;
            let rows = stmt.query_map([], |row| row_to_deployment(&conn, row))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await?
    }

    async fn get_deployment(&self, id: &str) -> Result<Option<Deployment>, StoreError> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<Option<Deployment>, StoreError> {
            let conn = pool.get()?;
            let dep = conn
                .query_row("SELECT * FROM deployments WHERE id = ?1", params![id], |row| {
                    row_to_deployment(&conn, row)
                })
                .optional()?;
            Ok(dep)
        })
        .await?
    }

    async fn create_deployment(&self, req: CreateDeploymentRequest) -> Result<Deployment, StoreError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Deployment, StoreError> {
            let conn = pool.get()?;
            let existing: Option<String> = conn
                .query_row("SELECT id FROM deployments WHERE name = ?1", params![req.name], |r| {
                    r.get(0)
                })
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::DuplicateName(req.name));
            }
            let dep_id = id::deployment_id();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO deployments (id, name, description, environment, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![dep_id, req.name, req.description, environment_str(req.environment), now],
            )?;
            Ok(Deployment {
                id: dep_id,
                name: req.name,
                description: req.description,
                environment: req.environment,
                created_at: parse_ts(&now),
                updated_at: parse_ts(&now),
                agents_count: 0,
                agents_online: 0,
                metrics_count: 0,
            })
        })
        .await?
    }

    async fn update_deployment(
        &self,
        id: &str,
        req: UpdateDeploymentRequest,
    ) -> Result<Option<Deployment>, StoreError> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<Option<Deployment>, StoreError> {
            let conn = pool.get()?;
            let exists: Option<String> = conn
                .query_row("SELECT id FROM deployments WHERE id = ?1", params![id], |r| r.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }
            if let Some(name) = &req.name {
                let dup: Option<String> = conn
                    .query_row(
                        "SELECT id FROM deployments WHERE name = ?1 AND id != ?2",
                        params![name, id],
                        |r| r.get(0),
                    )
                    .optional()?;
                if dup.is_some() {
                    return Err(StoreError::DuplicateName(name.clone()));
                }
                conn.execute("UPDATE deployments SET name = ?1 WHERE id = ?2", params![name, id])?;
            }
            if let Some(description) = &req.description {
                conn.execute(
                    "UPDATE deployments SET description = ?1 WHERE id = ?2",
                    params![description, id],
                )?;
            }
            if let Some(environment) = req.environment {
                conn.execute(
                    "UPDATE deployments SET environment = ?1 WHERE id = ?2",
                    params![environment_str(environment), id],
                )?;
            }
            conn.execute(
                "UPDATE deployments SET updated_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), id],
            )?;
            let dep = conn
                .query_row("SELECT * FROM deployments WHERE id = ?1", params![id], |row| {
                    row_to_deployment(&conn, row)
                })
                .optional()?;
            Ok(dep)
        })
        .await?
    }

    async fn delete_deployment(&self, id: &str) -> Result<bool, StoreError> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let conn = pool.get()?;
            conn.execute("DELETE FROM agents WHERE deployment_id = ?1", params![id])?;
            let changed = conn.execute("DELETE FROM deployments WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await?
    }

    async fn list_agents(&self, deployment_id: Option<&str>) -> Result<Vec<Agent>, StoreError> {
        let pool = self.pool.clone();
        let deployment_id = deployment_id.map(str::to_owned);
        tokio::task::spawn_blocking(move || -> Result<Vec<Agent>, StoreError> {
            let conn = pool.get()?;
            let mut out = Vec::new();
            if let Some(dep) = deployment_id {
                let mut stmt = conn.prepare("SELECT * FROM agents WHERE deployment_id = ?1")?;
                let rows = stmt.query_map(params![dep], row_to_agent)?;
                for row in rows {
                    out.push(row?);
                }
            } else {
                let mut stmt = conn.prepare("SELECT * FROM agents")?;
                let rows = stmt.query_map([], row_to_agent)?;
                for row in rows {
                    out.push(row?);
                }
            }
            Ok(out)
        })
        .await?
    }

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, StoreError> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<Option<Agent>, StoreError> {
            let conn = pool.get()?;
            let agent = conn
                .query_row("SELECT * FROM agents WHERE id = ?1", params![id], row_to_agent)
                .optional()?;
            Ok(agent)
        })
        .await?
    }

    async fn register_agent(
        &self,
        deployment_id: &str,
        req: RegisterAgentRequest,
    ) -> Result<Agent, StoreError> {
        let pool = self.pool.clone();
        let deployment_id = deployment_id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<Agent, StoreError> {
            let conn = pool.get()?;
            let dep_exists: Option<String> = conn
                .query_row(
                    "SELECT id FROM deployments WHERE id = ?1",
                    params![deployment_id],
                    |r| r.get(0),
                )
                .optional()?;
            if dep_exists.is_none() {
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO deployments (id, name, description, environment, created_at, updated_at)
                     VALUES (?1, ?1, 'Auto-created deployment', 'development', ?2, ?2)",
                    params![deployment_id, now],
                )?;
            }

            let agent_id = req.agent_id.clone().unwrap_or_else(|| id::agent_id(&req.hostname));
            let now = Utc::now().to_rfc3339();
            let metrics_json = serde_json::to_string(&req.metrics).unwrap_or_else(|_| "[]".to_owned());

            let existing: Option<String> = conn
                .query_row("SELECT id FROM agents WHERE id = ?1", params![agent_id], |r| r.get(0))
                .optional()?;

            let metrics_count = req.metrics.len() as i64;
            if existing.is_some() {
                conn.execute(
                    "UPDATE agents SET hostname = ?1, platform = ?2, agent_version = ?3,
                     last_seen = ?4, metrics = ?5, metrics_count = ?6, location = ?7, region = ?8,
                     latitude = ?9, longitude = ?10, ip_address = ?11 WHERE id = ?12",
                    params![
                        req.hostname,
                        req.platform,
                        req.agent_version,
                        now,
                        metrics_json,
                        metrics_count,
                        req.location,
                        req.region,
                        req.latitude,
                        req.longitude,
                        req.ip_address,
                        agent_id,
                    ],
                )?;
            } else {
                conn.execute(
                    "INSERT INTO agents
                     (id, deployment_id, hostname, platform, agent_version, last_seen,
                      registered_at, metrics, metrics_count, location, region, latitude,
                      longitude, ip_address)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        agent_id,
                        deployment_id,
                        req.hostname,
                        req.platform,
                        req.agent_version,
                        now,
                        metrics_json,
                        metrics_count,
                        req.location,
                        req.region,
                        req.latitude,
                        req.longitude,
                        req.ip_address,
                    ],
                )?;
            }

            let agent = conn.query_row("SELECT * FROM agents WHERE id = ?1", params![agent_id], row_to_agent)?;
            Ok(agent)
        })
        .await?
    }

    async fn heartbeat_agent(&self, id: &str, req: HeartbeatRequest) -> Result<Option<Agent>, StoreError> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<Option<Agent>, StoreError> {
            let conn = pool.get()?;
            let exists: Option<String> = conn
                .query_row("SELECT id FROM agents WHERE id = ?1", params![id], |r| r.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }
            let now = Utc::now().to_rfc3339();
            if req.metrics.is_empty() {
                conn.execute("UPDATE agents SET last_seen = ?1 WHERE id = ?2", params![now, id])?;
            } else {
                let metrics_json = serde_json::to_string(&req.metrics).unwrap_or_else(|_| "[]".to_owned());
                conn.execute(
                    "UPDATE agents SET last_seen = ?1, metrics = ?2, metrics_count = ?3 WHERE id = ?4",
                    params![now, metrics_json, req.metrics.len() as i64, id],
                )?;
            }
            let agent = conn.query_row("SELECT * FROM agents WHERE id = ?1", params![id], row_to_agent)?;
            Ok(Some(agent))
        })
        .await?
    }

    async fn update_agent_config(
        &self,
        id: &str,
        req: UpdateAgentConfigRequest,
    ) -> Result<Option<Agent>, StoreError> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<Option<Agent>, StoreError> {
            let conn = pool.get()?;
            let exists: Option<String> = conn
                .query_row("SELECT id FROM agents WHERE id = ?1", params![id], |r| r.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }
            if let Some(paused) = req.paused {
                conn.execute(
                    "UPDATE agents SET paused = ?1 WHERE id = ?2",
                    params![i64::from(paused), id],
                )?;
            }
            if let Some(interval) = req.collection_interval {
                conn.execute(
                    "UPDATE agents SET collection_interval = ?1 WHERE id = ?2",
                    params![interval, id],
                )?;
            }
            let agent = conn.query_row("SELECT * FROM agents WHERE id = ?1", params![id], row_to_agent)?;
            Ok(Some(agent))
        })
        .await?
    }

    async fn get_agent_config(&self, id: &str) -> Result<Option<AgentConfig>, StoreError> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<Option<AgentConfig>, StoreError> {
            let conn = pool.get()?;
            let row = conn
                .query_row(
                    "SELECT paused, collection_interval FROM agents WHERE id = ?1",
                    params![id],
                    |r| {
                        let paused: i64 = r.get(0)?;
                        let interval: i64 = r.get(1)?;
                        Ok(AgentConfig {
                            paused: paused != 0,
                            collection_interval: interval as u32,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
        .await?
    }

    async fn delete_agent(&self, id: &str) -> Result<bool, StoreError> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let conn = pool.get()?;
            let changed = conn.execute("DELETE FROM agents WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await?
    }

    async fn get_deployment_metric_names(&self, deployment_id: &str) -> Result<Vec<String>, StoreError> {
        let pool = self.pool.clone();
        let deployment_id = deployment_id.to_owned();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>, StoreError> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT metrics FROM agents WHERE deployment_id = ?1")?;
            let mut names = BTreeSet::new();
            let rows = stmt.query_map(params![deployment_id], |r| r.get::<_, String>(0))?;
            for row in rows {
                let raw = row?;
                if let Ok(list) = serde_json::from_str::<Vec<String>>(&raw) {
                    names.extend(list);
                }
            }
            Ok(names.into_iter().collect())
        })
        .await?
    }

    async fn add_metrics(&self, samples: &[MetricSample]) -> Result<usize, StoreError> {
        let pool = self.pool.clone();
        let samples = samples.to_vec();
        let max_points = self.max_points;
        tokio::task::spawn_blocking(move || -> Result<usize, StoreError> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            for sample in &samples {
                let labels_json = serde_json::to_string(&sample.labels).unwrap_or_else(|_| "{}".to_owned());
                tx.execute(
                    "INSERT INTO metrics (name, value, timestamp, labels) VALUES (?1, ?2, ?3, ?4)",
                    params![sample.name, sample.value, sample.timestamp.to_rfc3339(), labels_json],
                )?;
            }
            tx.commit()?;
            SqliteStore::trim_metrics(&conn, max_points)?;
            Ok(samples.len())
        })
        .await?
    }

    async fn get_metrics(
        &self,
        name: &str,
        deployment: Option<&str>,
        hours: i64,
        limit: usize,
    ) -> Result<Vec<MetricPoint>, StoreError> {
        let pool = self.pool.clone();
        let name = name.to_owned();
        let deployment = deployment.map(str::to_owned);
        tokio::task::spawn_blocking(move || -> Result<Vec<MetricPoint>, StoreError> {
            let conn = pool.get()?;
            let cutoff = (Utc::now() - chrono::Duration::hours(hours)).to_rfc3339();
            let mut out = Vec::new();
            let mut stmt = if deployment.is_some() {
                conn.prepare(
                    "SELECT value, timestamp, labels FROM metrics
                     WHERE name = ?1 AND timestamp > ?2 AND json_extract(labels, '$.deployment') = ?3
                     ORDER BY timestamp ASC LIMIT ?4",
                )?
            } else {
                conn.prepare(
                    "SELECT value, timestamp, labels FROM metrics
                     WHERE name = ?1 AND timestamp > ?2
                     ORDER BY timestamp ASC LIMIT ?3",
                )?
            };
            let rows: Box<dyn Iterator<Item = rusqlite::Result<(f64, String, String)>>> =
                if let Some(dep) = &deployment {
                    Box::new(stmt.query_map(params![name, cutoff, dep, limit as i64], |r| {
                        Ok((r.get(0)?, r.get(1)?, r.get(2)?))
                    })?)
                } else {
                    Box::new(stmt.query_map(params![name, cutoff, limit as i64], |r| {
                        Ok((r.get(0)?, r.get(1)?, r.get(2)?))
                    })?)
                };
            for row in rows {
                let (value, ts, labels) = row?;
                out.push(MetricPoint {
                    name: name.clone(),
                    value,
                    timestamp: parse_ts(&ts),
                    labels: serde_json::from_str(&labels).unwrap_or_default(),
                });
            }
            Ok(out)
        })
        .await?
    }

    async fn get_latest(&self, name: &str, deployment: Option<&str>) -> Result<Option<MetricPoint>, StoreError> {
        let pool = self.pool.clone();
        let name = name.to_owned();
        let deployment = deployment.map(str::to_owned);
        tokio::task::spawn_blocking(move || -> Result<Option<MetricPoint>, StoreError> {
            let conn = pool.get()?;
            let row = if let Some(dep) = &deployment {
                conn.query_row(
                    "SELECT value, timestamp, labels FROM metrics
                     WHERE name = ?1 AND json_extract(labels, '$.deployment') = ?2
                     ORDER BY timestamp DESC LIMIT 1",
                    params![name, dep],
                    |r| Ok((r.get::<_, f64>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?)),
                )
                .optional()?
            } else {
                conn.query_row(
                    "SELECT value, timestamp, labels FROM metrics WHERE name = ?1
                     ORDER BY timestamp DESC LIMIT 1",
                    params![name],
                    |r| Ok((r.get::<_, f64>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?)),
                )
                .optional()?
            };
            Ok(row.map(|(value, ts, labels)| MetricPoint {
                name: name.clone(),
                value,
                timestamp: parse_ts(&ts),
                labels: serde_json::from_str(&labels).unwrap_or_default(),
            }))
        })
        .await?
    }

    async fn get_metric_names(&self, deployment: Option<&str>) -> Result<Vec<String>, StoreError> {
        let pool = self.pool.clone();
        let deployment = deployment.map(str::to_owned);
        tokio::task::spawn_blocking(move || -> Result<Vec<String>, StoreError> {
            let conn = pool.get()?;
            let mut out = Vec::new();
            if let Some(dep) = &deployment {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT name FROM metrics WHERE json_extract(labels, '$.deployment') = ?1 ORDER BY name",
                )?;
                let rows = stmt.query_map(params![dep], |r| r.get::<_, String>(0))?;
                for row in rows {
                    out.push(row?);
                }
            } else {
                let mut stmt = conn.prepare("SELECT DISTINCT name FROM metrics ORDER BY name")?;
                let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
                for row in rows {
                    out.push(row?);
                }
            }
            Ok(out)
        })
        .await?
    }
}

fn environment_str(env: Environment) -> &'static str {
    match env {
        Environment::Development => "development",
        Environment::Staging => "staging",
        Environment::Production => "production",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_core::model::Environment;

    fn temp_store() -> SqliteStore {
        let dir = std::env::temp_dir().join(format!("helios-test-{}", uuid::Uuid::new_v4()));
        SqliteStore::open(&dir, 1000).expect("open in-temp-dir sqlite store")
    }

    #[tokio::test]
    async fn create_and_get_deployment_roundtrip() {
        let store = temp_store();
        let dep = store
            .create_deployment(CreateDeploymentRequest {
                name: "prod-web".to_owned(),
                description: "web tier".to_owned(),
                environment: Environment::Production,
            })
            .await
            .unwrap();
        let fetched = store.get_deployment(&dep.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "prod-web");
        assert_eq!(fetched.agents_count, 0);
    }

    #[tokio::test]
    async fn duplicate_deployment_name_is_rejected() {
        let store = temp_store();
        let req = CreateDeploymentRequest {
            name: "dup".to_owned(),
            description: String::new(),
            environment: Environment::Development,
        };
        store.create_deployment(req.clone()).await.unwrap();
        let err = store.create_deployment(req).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn deleting_deployment_cascades_to_agents() {
        let store = temp_store();
        let dep = store
            .create_deployment(CreateDeploymentRequest {
                name: "cascade".to_owned(),
                description: String::new(),
                environment: Environment::Development,
            })
            .await
            .unwrap();
        store
            .register_agent(
                &dep.id,
                RegisterAgentRequest {
                    hostname: "host-a".to_owned(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(store.delete_deployment(&dep.id).await.unwrap());
        assert!(store.list_agents(Some(&dep.id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metrics_trim_respects_max_points() {
        let store = SqliteStore::open(
            &std::env::temp_dir().join(format!("helios-trim-{}", uuid::Uuid::new_v4())),
            5,
        )
        .unwrap();
        let samples: Vec<MetricSample> = (0..10)
            .map(|i| MetricSample {
                name: "cpu_utilization".to_owned(),
                value: f64::from(i),
                timestamp: Utc::now(),
                kind: helios_core::model::MetricType::Gauge,
                labels: Default::default(),
                source: "test".to_owned(),
            })
            .collect();
        store.add_metrics(&samples).await.unwrap();
        let names = store.get_metric_names(None).await.unwrap();
        assert_eq!(names, vec!["cpu_utilization".to_owned()]);
    }
}
