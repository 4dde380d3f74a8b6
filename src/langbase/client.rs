use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{CreatePipeResponse, PipeRequest, PipeResponse, StepPipeDefinition};
use crate::config::{LangbaseConfig, RequestConfig};
use crate::error::{LangbaseError, LangbaseResult};

/// Client for interacting with Langbase Pipes API
#[derive(Clone)]
pub struct LangbaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    request_config: RequestConfig,
}

impl LangbaseClient {
    /// Create a new Langbase client
    pub fn new(config: &LangbaseConfig, request_config: RequestConfig) -> LangbaseResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LangbaseError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call a Langbase pipe, retrying transient failures with exponential
    /// backoff. Client errors other than 429 are returned immediately.
    pub async fn call_pipe(&self, request: PipeRequest) -> LangbaseResult<PipeResponse> {
        let url = format!("{}/v1/pipes/run", self.base_url);
        let mut attempt = 0;

        loop {
            let start = Instant::now();
            debug!(
                pipe = %request.name,
                max_tokens = ?request.max_tokens,
                attempt = attempt,
                "Calling Langbase pipe"
            );

            let error = match self.post_json::<_, PipeResponse>(&url, &request).await {
                Ok(response) => {
                    debug!(
                        pipe = %request.name,
                        latency_ms = start.elapsed().as_millis(),
                        completion_tokens = ?response.completion_tokens(),
                        "Langbase pipe call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => e,
            };

            error!(
                pipe = %request.name,
                error = %error,
                latency_ms = start.elapsed().as_millis(),
                attempt = attempt,
                "Langbase pipe call failed"
            );

            if !is_retryable(&error) {
                return Err(error);
            }
            if attempt >= self.request_config.max_retries {
                return Err(LangbaseError::Unavailable {
                    message: error.to_string(),
                    retries: attempt,
                });
            }

            attempt += 1;
            let delay = backoff_delay(self.request_config.retry_delay_ms, attempt);
            warn!(
                pipe = %request.name,
                retry = attempt,
                delay_ms = delay.as_millis(),
                "Retrying Langbase request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Create or update the step-generation pipe. A 409 means the pipe
    /// already exists and is treated as success.
    pub async fn ensure_reasoning_pipe(&self, pipe_name: &str) -> LangbaseResult<()> {
        let url = format!("{}/v1/pipes", self.base_url);
        let definition = StepPipeDefinition::new(pipe_name);

        info!(pipe = %pipe_name, model = %definition.model, "Upserting reasoning step pipe");

        match self
            .post_json::<_, CreatePipeResponse>(&url, &definition)
            .await
        {
            Ok(created) => {
                info!(
                    pipe = %created.name,
                    url = created.url.as_deref().unwrap_or("-"),
                    "Reasoning step pipe ready"
                );
                Ok(())
            }
            Err(LangbaseError::Api { status: 409, .. }) => {
                info!(pipe = %pipe_name, "Pipe already exists");
                Ok(())
            }
            Err(e) => {
                error!(pipe = %pipe_name, error = %e, "Failed to upsert reasoning step pipe");
                Err(e)
            }
        }
    }

    /// POST `body` as JSON and decode the JSON reply. Non-2xx statuses
    /// become `Api` errors carrying the response body.
    async fn post_json<B, R>(&self, url: &str, body: &B) -> LangbaseResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LangbaseError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    LangbaseError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| LangbaseError::InvalidResponse {
                message: format!("Failed to parse response from {}: {}", url, e),
            })
    }
}

/// Timeouts, transport errors, 429 and 5xx are worth retrying.
fn is_retryable(error: &LangbaseError) -> bool {
    match error {
        LangbaseError::Api { status, .. } => *status == 429 || *status >= 500,
        LangbaseError::Timeout { .. } | LangbaseError::Http(_) => true,
        LangbaseError::InvalidResponse { .. } | LangbaseError::Unavailable { .. } => false,
    }
}

/// Delay before retry number `attempt` (1-based): base, 2x base, 4x base...
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(factor))
}
