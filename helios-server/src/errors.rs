//! Server-facing error taxonomy.
//!
//! Every variant that can reach a handler response renders as a
//! [`problemdetails`] body tagged with a `tag:helios.dev,2026:*` type URI, in
//! the same shape the teacher's `uxum::errors` module used for its own
//! `TAG_UXUM_*` family.

use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::{ingest::IngestError, models::ModelError, store::StoreError};

pub(crate) const TAG_VALIDATION: &str = "tag:helios.dev,2026:validation";
pub(crate) const TAG_NOT_FOUND: &str = "tag:helios.dev,2026:not-found";
pub(crate) const TAG_NOT_READY: &str = "tag:helios.dev,2026:not-ready";
pub(crate) const TAG_STORE: &str = "tag:helios.dev,2026:store";
pub(crate) const TAG_AUTH: &str = "tag:helios.dev,2026:auth";

/// Top-level error type returned by route handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body failed schema or range validation (400/422).
    #[error("{0}")]
    Validation(String),
    /// Requested deployment/agent/metric does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),
    /// Models are not yet loaded (503).
    #[error("models not ready")]
    NotReady,
    /// Persistence-layer failure (500).
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Ingest pipeline failure.
    #[error(transparent)]
    Ingest(#[from] IngestError),
    /// Model manager / domain-service failure.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, tag, title) = match &self {
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, TAG_VALIDATION, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, TAG_NOT_FOUND, msg.clone()),
            Self::NotReady => (
                StatusCode::SERVICE_UNAVAILABLE,
                TAG_NOT_READY,
                self.to_string(),
            ),
            Self::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, TAG_STORE, self.to_string()),
            Self::Ingest(IngestError::InvalidBody(msg)) => {
                (StatusCode::BAD_REQUEST, TAG_VALIDATION, msg.clone())
            }
            Self::Ingest(_) => (StatusCode::INTERNAL_SERVER_ERROR, TAG_STORE, self.to_string()),
            Self::Model(ModelError::NotLoaded) => {
                (StatusCode::SERVICE_UNAVAILABLE, TAG_NOT_READY, self.to_string())
            }
            Self::Model(ModelError::Unknown(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, TAG_STORE, self.to_string())
            }
        };
        problemdetails::new(status)
            .with_type(tag)
            .with_title(title)
            .into_response()
    }
}
