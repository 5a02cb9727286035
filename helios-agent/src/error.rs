//! Error taxonomy for the agent process.

use thiserror::Error;

/// Errors encountered while loading or validating agent configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown source type: {0}")]
    UnknownSourceType(String),
    #[error("source {name} is missing required credential(s): {missing:?}")]
    MissingCredentials { name: String, missing: Vec<String> },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),
}

/// Errors a [`Source`](crate::source::Source) can report during `initialize()`.
///
/// Per the agent's failure semantics, an `InitError` removes the source from the
/// active set for this run; it is never propagated to a caller as fatal.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("credential rejected by backend: {0}")]
    CredentialRejected(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors from the HTTP channel to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication failed (401), not retrying")]
    Unauthorized,
    #[error("request error: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("retries exhausted after {attempts} attempt(s)")]
    RetriesExhausted { attempts: u32 },
}
