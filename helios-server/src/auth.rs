//! Shared-secret authentication [`tower`] layer.
//!
//! A single mechanism — bearer token or `X-API-Key`, checked for equality
//! against one configured secret — modeled on `uxum::auth::layer::AuthLayer`'s
//! shape (`poll_ready` passthrough, a future enum with a positive/negative
//! branch) without that module's pluggable provider/extractor generics or its
//! password-hashing machinery.

use std::{
    future::Future,
    pin::Pin,
    task::{ready, Context, Poll},
};

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    response::IntoResponse,
};
use pin_project::pin_project;
use serde::{Deserialize, Serialize};
use tower::{BoxError, Layer, Service};
use tracing::warn;

/// Paths served without checking the auth header.
pub const EXEMPT_PATHS: &[&str] = &["/health", "/ready", "/metrics", "/docs", "/redoc", "/openapi.json"];

/// Authentication configuration: a single shared secret, or disabled.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub shared_key: Option<String>,
}

/// [`tower::Layer`] enforcing [`AuthConfig`] on every non-exempt request.
#[derive(Clone)]
pub struct AuthLayer {
    config: AuthConfig,
}

impl AuthLayer {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            config: self.config.clone(),
            inner,
        }
    }
}

#[derive(Clone)]
pub struct AuthService<S> {
    config: AuthConfig,
    inner: S,
}

fn extract_key(req: &Request<Body>) -> Option<String> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let value = value.to_str().ok()?;
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.to_owned());
        }
    }
    req.headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response<Body>>,
    S::Error: Into<BoxError>,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = AuthFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match self.inner.poll_ready(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(res) => Poll::Ready(res.map_err(Into::into)),
        }
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let Some(shared_key) = self.config.shared_key.as_deref().filter(|_| self.config.enabled) else {
            return AuthFuture::Positive { inner: self.inner.call(req) };
        };
        if EXEMPT_PATHS.contains(&req.uri().path()) {
            return AuthFuture::Positive { inner: self.inner.call(req) };
        }
        match extract_key(&req) {
            Some(key) if key == shared_key => AuthFuture::Positive { inner: self.inner.call(req) },
            _ => {
                warn!(path = %req.uri().path(), "rejected unauthenticated request");
                AuthFuture::Negative
            }
        }
    }
}

#[pin_project(project = ProjectedOutcome)]
pub enum AuthFuture<F> {
    Positive {
        #[pin]
        inner: F,
    },
    Negative,
}

impl<F, E> Future for AuthFuture<F>
where
    F: Future<Output = Result<Response<Body>, E>>,
    E: Into<BoxError>,
{
    type Output = Result<Response<Body>, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ProjectedOutcome::Positive { inner } => Poll::Ready(Ok(ready!(inner.poll(cx).map_err(Into::into))?)),
            ProjectedOutcome::Negative => Poll::Ready(Ok(StatusCode::UNAUTHORIZED.into_response())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exempt_paths_cover_health_and_metrics() {
        assert!(EXEMPT_PATHS.contains(&"/health"));
        assert!(EXEMPT_PATHS.contains(&"/metrics"));
        assert!(!EXEMPT_PATHS.contains(&"/predict"));
    }
}
