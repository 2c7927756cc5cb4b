//! Coordinator Client
//!
//! Thin reqwest wrapper used by workers. Transport errors are retried with
//! exponential backoff; HTTP-level rejections are mapped back onto
//! [`AnalyzerError`] so callers can react to `UnknownWorker` and `DuplicateWorker`.

use crate::aggregate::types::Metrics;
use crate::config::WorkerConfig;
use crate::coordinator::protocol::*;
use crate::error::AnalyzerError;
use crate::ledger::types::ChunkId;
use crate::registry::types::WorkerId;

use anyhow::Result;
use reqwest::StatusCode;
use std::time::Duration;

pub struct CoordinatorClient {
    base_url: String,
    http_client: reqwest::Client,
    config: WorkerConfig,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>, config: WorkerConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn register(&self, worker_id: &WorkerId) -> Result<()> {
        let response = self
            .post_with_retry(ENDPOINT_REGISTER, &WorkerRequest { worker_id: worker_id.clone() })
            .await?;

        Self::check_status(response, worker_id).await?;
        Ok(())
    }

    /// Single attempt; the next period is the retry.
    pub async fn heartbeat(&self, worker_id: &WorkerId) -> Result<()> {
        let response = self
            .http_client
            .post(self.url(ENDPOINT_HEARTBEAT))
            .json(&WorkerRequest { worker_id: worker_id.clone() })
            .send()
            .await?;

        Self::check_status(response, worker_id).await?;
        Ok(())
    }

    pub async fn request_assignment(&self, worker_id: &WorkerId) -> Result<AssignmentResponse> {
        let response = self
            .post_with_retry(
                ENDPOINT_REQUEST_ASSIGNMENT,
                &WorkerRequest { worker_id: worker_id.clone() },
            )
            .await?;

        let response = Self::check_status(response, worker_id).await?;
        Ok(response.json().await?)
    }

    pub async fn submit(
        &self,
        worker_id: &WorkerId,
        chunk_id: ChunkId,
        metrics: Metrics,
    ) -> Result<SubmitResultResponse> {
        let payload = SubmitResultRequest {
            worker_id: worker_id.clone(),
            chunk_id,
            metrics,
        };

        let response = self.post_with_retry(ENDPOINT_SUBMIT_RESULTS, &payload).await?;
        let response = Self::check_status(response, worker_id).await?;
        Ok(response.json().await?)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn check_status(response: reqwest::Response, worker_id: &WorkerId) -> Result<reqwest::Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(AnalyzerError::UnknownWorker(worker_id.clone()).into()),
            StatusCode::CONFLICT => Err(AnalyzerError::DuplicateWorker(worker_id.clone()).into()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow::anyhow!("Coordinator answered {}: {}", status, body))
            }
        }
    }

    // --- HTTP Helpers with Backoff ---

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        endpoint: &str,
        payload: &T,
    ) -> Result<reqwest::Response> {
        let attempts = self.config.submit_attempts.max(1);
        let mut delay_ms = self.config.retry_backoff_ms;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(self.url(endpoint))
                .json(payload)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    tracing::debug!("POST {} failed (attempt {}): {}", endpoint, attempt + 1, e);
                    // Jitter keeps a pool of workers from retrying in lockstep
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(5_000);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

/// True when the coordinator no longer recognises the worker (unknown or dead).
pub fn is_unknown_worker(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<AnalyzerError>(),
        Some(AnalyzerError::UnknownWorker(_))
    )
}
