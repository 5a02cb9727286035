//! Agent runtime: concurrent source pollers, a bounded metrics buffer, a
//! flush loop delivering batches to the server, and server-driven command
//! application. Ported from
//! `original_source/agent/src/helios_agent/agent.py::Agent`.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use helios_core::{model::MetricSample, wire::Commands};
use tracing::{debug, info, warn};

use crate::{
    buffer::MetricsBuffer,
    client::HeliosClient,
    config::AgentConfig,
    error::ClientError,
    signal::SignalStream,
    source::{Source, SourceRegistry},
};

const PAUSE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Health snapshot returned by [`Agent::health_check`].
#[derive(Debug)]
pub struct AgentHealth {
    pub sources: BTreeMap<String, bool>,
    pub client: bool,
    pub metrics_buffered: usize,
}

struct ActiveSource {
    source: Box<dyn Source>,
    default_interval: u64,
}

/// Owns the sources, buffer, and HTTP channel for one collector process.
pub struct Agent {
    config: AgentConfig,
    sources: Vec<ActiveSource>,
    client: Option<Arc<HeliosClient>>,
    buffer: Arc<MetricsBuffer>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    interval_override: Arc<AtomicU32>,
}

impl Agent {
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        let buffer = Arc::new(MetricsBuffer::new(config.batch_size));
        Self {
            sources: Vec::new(),
            client: None,
            buffer,
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            interval_override: Arc::new(AtomicU32::new(0)),
            config,
        }
    }

    /// Build the HTTP client and instantiate every enabled, initializable
    /// source. A source that fails to build or initialize is logged and
    /// skipped — never fatal to the rest of the agent.
    pub fn setup(&mut self) -> Result<(), ClientError> {
        self.client = Some(Arc::new(HeliosClient::new(self.config.endpoint.clone())?));

        for source_config in self.config.sources.clone() {
            if !source_config.enabled {
                continue;
            }
            let Some(source) = SourceRegistry::create(source_config.clone()) else {
                warn!(r#type = %source_config.source_type, "unknown source type, skipping");
                continue;
            };
            self.sources.push(ActiveSource { source, default_interval: source_config.interval });
        }
        Ok(())
    }

    /// Must be called after [`Agent::setup`]: runs `initialize()` on every
    /// queued source, dropping any that reject it.
    pub async fn initialize_sources(&mut self) {
        let mut initialized = Vec::with_capacity(self.sources.len());
        for mut active in self.sources.drain(..) {
            match active.source.initialize().await {
                Ok(()) => {
                    info!(name = %active.source.name(), "source initialized");
                    initialized.push(active);
                }
                Err(e) => warn!(name = %active.source.name(), error = %e, "source failed to initialize, skipping"),
            }
        }
        self.sources = initialized;
    }

    /// Run every source exactly once and return the merged, successful
    /// output. Used by the out-of-scope CLI's `test` subcommand.
    pub async fn collect_once(&mut self) -> Vec<MetricSample> {
        let mut all = Vec::new();
        for active in &mut self.sources {
            if !active.source.is_enabled() {
                continue;
            }
            let result = active.source.collect().await;
            if result.success {
                all.extend(result.metrics);
            } else {
                warn!(source = %result.source, error = ?result.error, "collect_once: source failed");
            }
        }
        all
    }

    /// Probe every source plus the server, without affecting the running state.
    pub async fn health_check(&mut self) -> AgentHealth {
        let mut sources = BTreeMap::new();
        for active in &mut self.sources {
            sources.insert(active.source.name().to_owned(), active.source.health_check().await);
        }
        let client = match &self.client {
            Some(c) => c.check_health().await,
            None => false,
        };
        AgentHealth { sources, client, metrics_buffered: self.buffer.len() }
    }

    /// Install signal handlers, start one poller per source plus the flush
    /// loop, run until a shutdown signal arrives, then flush/close cleanly.
    pub async fn run(mut self) {
        self.running.store(true, Ordering::SeqCst);

        if let Some(client) = &self.client {
            if client.check_health().await {
                info!("connected to inference server");
            } else {
                warn!("inference server health check failed; continuing, flushes will retry");
            }
        }

        let mut poller_handles = Vec::with_capacity(self.sources.len());
        for active in self.sources.drain(..) {
            let buffer = self.buffer.clone();
            let running = self.running.clone();
            let paused = self.paused.clone();
            let interval_override = self.interval_override.clone();
            poller_handles.push(tokio::spawn(run_poller(active, buffer, running, paused, interval_override)));
        }

        let flush_handle = {
            let client = self.client.clone();
            let buffer = self.buffer.clone();
            let running = self.running.clone();
            let paused = self.paused.clone();
            let interval_override = self.interval_override.clone();
            let flush_interval = self.config.flush_interval;
            tokio::spawn(run_flush_loop(client, buffer, running, paused, interval_override, flush_interval))
        };

        match SignalStream::new() {
            Ok(mut signals) => {
                if let Err(e) = signals.next().await {
                    warn!(error = %e, "signal stream failed, stopping anyway");
                }
            }
            Err(e) => warn!(error = %e, "unable to install signal handlers, stopping immediately"),
        }

        info!("stopping agent");
        self.running.store(false, Ordering::SeqCst);

        for handle in poller_handles {
            let _ = handle.await;
        }
        let _ = flush_handle.await;

        if let Some(client) = &self.client {
            flush_once(client, &self.buffer, &self.paused, &self.interval_override).await;
            client.close().await;
        }
    }
}

async fn run_poller(
    mut active: ActiveSource,
    buffer: Arc<MetricsBuffer>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    interval_override: Arc<AtomicU32>,
) {
    while running.load(Ordering::SeqCst) {
        if paused.load(Ordering::SeqCst) {
            tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
            continue;
        }

        let result = active.source.collect().await;
        if result.success {
            debug!(source = %result.source, count = result.metrics.len(), "collected metrics");
            buffer.append(result.metrics);
        } else {
            warn!(source = %result.source, error = ?result.error, "collection failed");
        }

        let interval = match interval_override.load(Ordering::SeqCst) {
            0 => active.default_interval,
            n => u64::from(n),
        };
        tokio::time::sleep(Duration::from_secs(interval.max(1))).await;
    }
    active.source.close().await;
}

async fn run_flush_loop(
    client: Option<Arc<HeliosClient>>,
    buffer: Arc<MetricsBuffer>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    interval_override: Arc<AtomicU32>,
    flush_interval: u64,
) {
    while running.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(flush_interval.max(1))).await;
        let Some(client) = &client else {
            warn!("no client configured, discarding buffered metrics");
            continue;
        };
        flush_once(client, &buffer, &paused, &interval_override).await;
    }
}

async fn flush_once(
    client: &HeliosClient,
    buffer: &MetricsBuffer,
    paused: &AtomicBool,
    interval_override: &AtomicU32,
) {
    if buffer.is_empty() {
        return;
    }
    let batch = buffer.take_batch();
    let batch_len = batch.len();
    match client.send_metrics(batch.clone()).await {
        Ok(response) => {
            info!(received = response.received, "flushed metrics");
            if let Some(commands) = response.commands {
                apply_commands(commands, paused, interval_override);
            }
        }
        Err(e) => {
            warn!(error = %e, count = batch_len, "flush failed, re-buffering");
            buffer.prepend_unsent(batch);
        }
    }
}

fn apply_commands(commands: Commands, paused: &AtomicBool, interval_override: &AtomicU32) {
    if let Some(target) = commands.paused {
        let previous = paused.swap(target, Ordering::SeqCst);
        if previous != target {
            if target {
                info!("agent paused by server command");
            } else {
                info!("agent resumed by server command");
            }
        }
    }
    let interval = commands.collection_interval.unwrap_or(0);
    let previous = interval_override.swap(interval, Ordering::SeqCst);
    if previous != interval {
        if interval == 0 {
            info!(previous, "collection interval override reverted to per-source config");
        } else {
            info!(previous, current = interval, "collection interval overridden by server command");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32};

    use helios_core::wire::Commands;

    use super::apply_commands;

    #[test]
    fn apply_commands_updates_paused_and_interval() {
        let paused = AtomicBool::new(false);
        let interval_override = AtomicU32::new(0);
        apply_commands(
            Commands { paused: Some(true), collection_interval: Some(30) },
            &paused,
            &interval_override,
        );
        assert!(paused.load(Ordering::SeqCst));
        assert_eq!(interval_override.load(Ordering::SeqCst), 30);
    }

    #[test]
    fn apply_commands_leaves_paused_untouched_when_absent() {
        let paused = AtomicBool::new(true);
        let interval_override = AtomicU32::new(0);
        apply_commands(Commands { paused: None, collection_interval: None }, &paused, &interval_override);
        assert!(paused.load(Ordering::SeqCst));
        assert_eq!(interval_override.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn apply_commands_reverts_interval_override_when_absent_but_commands_present() {
        let paused = AtomicBool::new(false);
        let interval_override = AtomicU32::new(30);
        apply_commands(Commands { paused: None, collection_interval: None }, &paused, &interval_override);
        assert_eq!(interval_override.load(Ordering::SeqCst), 0);
    }

    use std::sync::atomic::Ordering;
}
