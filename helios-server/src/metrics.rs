//! Prometheus metrics exposition.
//!
//! A hand-registered `prometheus::Registry` stands in for the teacher's full
//! OpenTelemetry/OTLP meter pipeline — Helios has no distributed-tracing
//! export requirement, so `GET /metrics` simply renders the registry's
//! current state, the same shape as `uxum::metrics`'s `get_prom_metrics`
//! handler without the OTel meter provider underneath it.

use axum::{http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};

/// Process-wide metric instruments, registered once at startup.
pub struct Metrics {
    registry: Registry,
    pub ingest_requests: IntCounterVec,
    pub ingest_samples: IntCounterVec,
    pub predict_requests: IntCounterVec,
    pub detect_requests: IntCounterVec,
    pub recommend_requests: IntCounterVec,
    pub request_duration: HistogramVec,
}

impl Metrics {
    pub fn new(prefix: &str) -> Self {
        let registry = Registry::new();

        let ingest_requests = IntCounterVec::new(
            prometheus::opts!(format!("{prefix}_ingest_requests_total"), "Total ingest requests received"),
            &["outcome"],
        )
        .expect("metric definition is valid");
        let ingest_samples = IntCounterVec::new(
            prometheus::opts!(format!("{prefix}_ingest_samples_total"), "Total metric samples ingested"),
            &["outcome"],
        )
        .expect("metric definition is valid");
        let predict_requests = IntCounterVec::new(
            prometheus::opts!(format!("{prefix}_predict_requests_total"), "Total prediction requests"),
            &["model", "cache"],
        )
        .expect("metric definition is valid");
        let detect_requests = IntCounterVec::new(
            prometheus::opts!(format!("{prefix}_detect_requests_total"), "Total anomaly detection requests"),
            &["status"],
        )
        .expect("metric definition is valid");
        let recommend_requests = IntCounterVec::new(
            prometheus::opts!(format!("{prefix}_recommend_requests_total"), "Total recommendation requests"),
            &["action"],
        )
        .expect("metric definition is valid");
        let request_duration = HistogramVec::new(
            prometheus::histogram_opts!(
                format!("{prefix}_request_duration_seconds"),
                "Request handling duration"
            ),
            &["route"],
        )
        .expect("metric definition is valid");

        for collector in [
            Box::new(ingest_requests.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(ingest_samples.clone()),
            Box::new(predict_requests.clone()),
            Box::new(detect_requests.clone()),
            Box::new(recommend_requests.clone()),
            Box::new(request_duration.clone()),
        ] {
            registry
                .register(collector)
                .expect("metric registration does not collide");
        }

        Self {
            registry,
            ingest_requests,
            ingest_samples,
            predict_requests,
            detect_requests,
            recommend_requests,
            request_duration,
        }
    }

    fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&metric_families, &mut buf)
            .expect("text encoding does not fail");
        String::from_utf8(buf).expect("prometheus text encoding is valid utf8")
    }
}

/// `GET /metrics` handler.
pub async fn handler(axum::extract::State(state): axum::extract::State<crate::state::AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
