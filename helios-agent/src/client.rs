//! HTTP channel to the inference server. Ported from
//! `original_source/agent/src/helios_agent/client.py::HeliosClient`, resolving
//! the open question in spec.md §9 in favor of the `{commands}`-returning
//! contract: [`HeliosClient::send_metrics`] returns the parsed
//! [`helios_core::wire::IngestResponse`], not a bare boolean.

use helios_core::{
    model::MetricSample,
    wire::{
        DetectRequest, DetectResponse, IngestRequest, IngestResponse, PredictRequest, PredictResponse,
    },
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use tracing::{debug, error, warn};

use crate::{config::HeliosEndpoint, error::ClientError};

const AGENT_VERSION: &str = "0.1.0";

/// Authenticated HTTP channel to one inference server.
pub struct HeliosClient {
    client: ClientWithMiddleware,
    endpoint: HeliosEndpoint,
}

impl HeliosClient {
    /// Build a client from endpoint configuration.
    pub fn new(endpoint: HeliosEndpoint) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(endpoint.timeout))
            .user_agent(format!("helios-agent/{AGENT_VERSION}"))
            .build()
            .map_err(reqwest_middleware::Error::Reqwest)?;
        let client = ClientBuilder::new(inner).with(TracingMiddleware::default()).build();
        Ok(Self { client, endpoint })
    }

    fn base_url(&self) -> &str {
        self.endpoint.url.trim_end_matches('/')
    }

    fn apply_auth(&self, builder: reqwest_middleware::RequestBuilder) -> reqwest_middleware::RequestBuilder {
        match &self.endpoint.api_key {
            Some(key) => builder.bearer_auth(key).header("X-API-Key", key),
            None => builder,
        }
    }

    /// POST a batch of samples to `/api/v1/ingest`, retrying per the agent's
    /// documented contract: linear backoff, no retry on 401, honor
    /// `Retry-After` on 429.
    pub async fn send_metrics(&self, metrics: Vec<MetricSample>) -> Result<IngestResponse, ClientError> {
        if metrics.is_empty() {
            return Ok(IngestResponse { received: 0, commands: None });
        }

        let body = IngestRequest {
            metrics,
            agent_version: AGENT_VERSION.to_owned(),
            sent_at: chrono::Utc::now(),
        };
        let url = format!("{}/api/v1/ingest", self.base_url());

        for attempt in 1..=self.endpoint.retry_attempts {
            let request = self.apply_auth(self.client.post(&url).json(&body));
            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(attempt, error = %e, "ingest request failed, will retry");
                    backoff(self.endpoint.retry_delay, attempt).await;
                    continue;
                }
            };

            match response.status().as_u16() {
                200 => {
                    let parsed: IngestResponse = response.json().await.map_err(|e| ClientError::Request(reqwest_middleware::Error::Reqwest(e)))?;
                    debug!(received = parsed.received, "ingest succeeded");
                    return Ok(parsed);
                }
                401 => {
                    error!("ingest rejected: unauthorized, check API key");
                    return Err(ClientError::Unauthorized);
                }
                429 => {
                    let retry_after = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<f64>().ok())
                        .unwrap_or(self.endpoint.retry_delay * 2.0);
                    warn!(attempt, retry_after, "rate limited, sleeping before retry");
                    tokio::time::sleep(std::time::Duration::from_secs_f64(retry_after)).await;
                }
                status => {
                    let body_text = response.text().await.unwrap_or_default();
                    warn!(attempt, status, "ingest failed, will retry");
                    if attempt == self.endpoint.retry_attempts {
                        return Err(ClientError::Server { status, body: body_text });
                    }
                    backoff(self.endpoint.retry_delay, attempt).await;
                }
            }
        }

        Err(ClientError::RetriesExhausted { attempts: self.endpoint.retry_attempts })
    }

    /// `GET /health`, returning whether the server reports healthy.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.base_url());
        self.client
            .get(url)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Convenience wrapper around `POST /predict`. Not used by the agent's own
    /// poll/flush loops; kept for the future CLI collaborator (out of scope),
    /// which needs exactly this authenticated channel.
    pub async fn get_predictions(&self, request: &PredictRequest) -> Result<PredictResponse, ClientError> {
        let url = format!("{}/predict", self.base_url());
        let response = self.apply_auth(self.client.post(url).json(request)).send().await?;
        response.json().await.map_err(|e| ClientError::Request(reqwest_middleware::Error::Reqwest(e)))
    }

    /// Convenience wrapper around `POST /detect`.
    pub async fn detect_anomalies(&self, request: &DetectRequest) -> Result<DetectResponse, ClientError> {
        let url = format!("{}/detect", self.base_url());
        let response = self.apply_auth(self.client.post(url).json(request)).send().await?;
        response.json().await.map_err(|e| ClientError::Request(reqwest_middleware::Error::Reqwest(e)))
    }

    /// No-op: `reqwest`'s connection pool needs no explicit teardown. Kept for
    /// symmetry with [`crate::source::Source::close`] and the documented
    /// shutdown sequence (sources close, then the HTTP client "closes").
    pub async fn close(&self) {}
}

async fn backoff(retry_delay: f64, attempt: u32) {
    tokio::time::sleep(std::time::Duration::from_secs_f64(retry_delay * f64::from(attempt))).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_metrics_with_empty_batch_is_trivially_ok() {
        let client = HeliosClient::new(HeliosEndpoint::default()).expect("client builds");
        let response = client.send_metrics(Vec::new()).await.expect("empty batch never fails");
        assert_eq!(response.received, 0);
        assert!(response.commands.is_none());
    }
}
