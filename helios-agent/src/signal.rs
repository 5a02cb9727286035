//! Graceful-shutdown signal handling, trimmed to the two signals the agent
//! runtime contract names: SIGINT and SIGTERM. Mirrors
//! `helios_server::signal`'s shape; duplicated rather than shared since
//! `helios-core` carries no I/O of its own.

use thiserror::Error;
use tokio::signal::unix;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("unable to register signal handler: {0}")]
    Register(#[source] std::io::Error),
}

fn register(kind: unix::SignalKind) -> Result<unix::Signal, SignalError> {
    unix::signal(kind).map_err(SignalError::Register)
}

/// A stream over the process's shutdown signals.
pub struct SignalStream {
    sig_term: unix::Signal,
    sig_int: unix::Signal,
}

impl SignalStream {
    pub fn new() -> Result<Self, SignalError> {
        Ok(Self {
            sig_term: register(unix::SignalKind::terminate())?,
            sig_int: register(unix::SignalKind::interrupt())?,
        })
    }

    /// Wait for the next shutdown signal, restarting a handler if its stream
    /// unexpectedly closes.
    pub async fn next(&mut self) -> Result<(), SignalError> {
        loop {
            tokio::select! {
                ret = self.sig_term.recv() => match ret {
                    Some(()) => { info!(kind = "SIGTERM", "received signal"); return Ok(()); }
                    None => {
                        warn!(kind = "SIGTERM", "signal handler exited, restarting");
                        self.sig_term = register(unix::SignalKind::terminate())?;
                    }
                },
                ret = self.sig_int.recv() => match ret {
                    Some(()) => { info!(kind = "SIGINT", "received signal"); return Ok(()); }
                    None => {
                        warn!(kind = "SIGINT", "signal handler exited, restarting");
                        self.sig_int = register(unix::SignalKind::interrupt())?;
                    }
                },
            }
        }
    }
}
