//! Request-duration metrics [`tower`] layer.
//!
//! A trimmed-down version of `uxum::metrics::HttpMetrics`: no OTel meter
//! provider, no active-request gauge, no request/response body size
//! histograms, just the one instrument Helios's `/metrics` endpoint exposes
//! today, recorded against the matched route rather than the raw URI.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{ready, Context, Poll},
    time::Instant,
};

use axum::extract::MatchedPath;
use http::{Request, Response};
use pin_project::pin_project;
use tower::{Layer, Service};

use crate::metrics::Metrics;

/// Wraps a service so every request's wall-clock duration is recorded into
/// `Metrics::request_duration`, labeled by matched route.
#[derive(Clone)]
pub struct RequestMetricsLayer {
    metrics: Arc<Metrics>,
}

impl RequestMetricsLayer {
    #[must_use]
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for RequestMetricsLayer {
    type Service = RequestMetrics<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestMetrics { inner, metrics: self.metrics.clone() }
    }
}

#[derive(Clone)]
pub struct RequestMetrics<S> {
    inner: S,
    metrics: Arc<Metrics>,
}

impl<S, T, U> Service<Request<T>> for RequestMetrics<S>
where
    S: Service<Request<T>, Response = Response<U>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = RequestMetricsFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<T>) -> Self::Future {
        let path = req.extensions().get::<MatchedPath>().map(|p| p.as_str().to_owned());
        RequestMetricsFuture {
            inner: self.inner.call(req),
            metrics: self.metrics.clone(),
            start: Instant::now(),
            path,
        }
    }
}

#[pin_project]
pub struct RequestMetricsFuture<F> {
    #[pin]
    inner: F,
    metrics: Arc<Metrics>,
    start: Instant,
    path: Option<String>,
}

impl<F, U, E> Future for RequestMetricsFuture<F>
where
    F: Future<Output = Result<Response<U>, E>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let resp = ready!(this.inner.poll(cx));
        let route = this.path.as_deref().unwrap_or("");
        this.metrics
            .request_duration
            .with_label_values(&[route])
            .observe(this.start.elapsed().as_secs_f64());
        Poll::Ready(resp)
    }
}
