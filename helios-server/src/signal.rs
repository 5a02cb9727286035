//! Graceful-shutdown signal handling, trimmed to the two signals the agent
//! runtime contract names: SIGINT and SIGTERM.

use thiserror::Error;
use tokio::signal::unix;
use tracing::{info, warn};

/// Error registering a Unix signal handler.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("unable to register signal handler: {0}")]
    Register(#[source] std::io::Error),
}

fn register(kind: unix::SignalKind) -> Result<unix::Signal, SignalError> {
    unix::signal(kind).map_err(SignalError::Register)
}

/// Which shutdown signal was received.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Signal {
    /// SIGTERM
    Terminate,
    /// SIGINT
    Interrupt,
}

impl Signal {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Terminate => "SIGTERM",
            Self::Interrupt => "SIGINT",
        }
    }
}

/// A stream over the process's shutdown signals.
pub struct SignalStream {
    sig_term: unix::Signal,
    sig_int: unix::Signal,
}

impl SignalStream {
    /// Register handlers for SIGTERM and SIGINT.
    pub fn new() -> Result<Self, SignalError> {
        Ok(Self {
            sig_term: register(unix::SignalKind::terminate())?,
            sig_int: register(unix::SignalKind::interrupt())?,
        })
    }

    /// Wait for the next shutdown signal, restarting a handler if its stream
    /// unexpectedly closes.
    pub async fn next(&mut self) -> Result<Signal, SignalError> {
        loop {
            tokio::select! {
                ret = self.sig_term.recv() => match ret {
                    Some(()) => {
                        info!(kind = "SIGTERM", "received signal");
                        return Ok(Signal::Terminate);
                    }
                    None => {
                        warn!(kind = "SIGTERM", "signal handler exited, restarting");
                        self.sig_term = register(unix::SignalKind::terminate())?;
                    }
                },
                ret = self.sig_int.recv() => match ret {
                    Some(()) => {
                        info!(kind = "SIGINT", "received signal");
                        return Ok(Signal::Interrupt);
                    }
                    None => {
                        warn!(kind = "SIGINT", "signal handler exited, restarting");
                        self.sig_int = register(unix::SignalKind::interrupt())?;
                    }
                },
            }
        }
    }
}
