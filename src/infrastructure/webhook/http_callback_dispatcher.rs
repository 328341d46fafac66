use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{Map, Value};

use crate::application::ports::{CallbackDispatcher, DeliveryOutcome};
use crate::application::services::RetryPolicy;
use crate::domain::{JobId, JobStatus};

pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CALLBACK_USER_AGENT: &str = "prompt-relay/1.0";

#[derive(Debug, thiserror::Error)]
enum CallbackError {
    #[error("webhook returned status {0}")]
    Status(u16),
    #[error("webhook request failed: {0}")]
    Transport(String),
}

impl CallbackError {
    /// Caller-side (4xx) rejections are permanent.
    fn is_retryable(&self) -> bool {
        match self {
            CallbackError::Status(status) => *status >= 500,
            CallbackError::Transport(_) => true,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            CallbackError::Status(status) => Some(*status),
            CallbackError::Transport(_) => None,
        }
    }
}

/// POSTs JSON callbacks with a per-attempt timeout and bounded retries.
pub struct HttpCallbackDispatcher {
    client: Client,
    retry_policy: RetryPolicy,
}

impl HttpCallbackDispatcher {
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        retry_policy: RetryPolicy,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            retry_policy,
        })
    }

    async fn deliver(&self, url: &str, job_id: &JobId, payload: Value) -> DeliveryOutcome {
        let retried = self
            .retry_policy
            .run(
                |attempt| self.post_once(url, job_id, &payload, attempt),
                CallbackError::is_retryable,
            )
            .await;

        match retried.result {
            Ok(status) => DeliveryOutcome::Delivered {
                status,
                attempts: retried.attempts,
            },
            Err(e) => {
                tracing::error!(
                    url = %url,
                    job_id = %job_id,
                    total_attempts = retried.attempts,
                    error = %e,
                    "Webhook callback failed after all retries"
                );
                DeliveryOutcome::Failed {
                    error: e.to_string(),
                    status: e.status(),
                    attempts: retried.attempts,
                }
            }
        }
    }

    async fn post_once(
        &self,
        url: &str,
        job_id: &JobId,
        payload: &Value,
        attempt: u32,
    ) -> Result<u16, CallbackError> {
        tracing::info!(url = %url, job_id = %job_id, attempt = attempt, "Sending webhook callback");

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, attempt = attempt, error = %e, "Webhook request failed");
                CallbackError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(url = %url, status = status.as_u16(), "Webhook callback successful");
            return Ok(status.as_u16());
        }

        tracing::warn!(
            url = %url,
            attempt = attempt,
            status = status.as_u16(),
            "Webhook callback returned error status"
        );
        Err(CallbackError::Status(status.as_u16()))
    }
}

/// Builds the callback body. Metadata is merged first so the identifying
/// fields always reflect the job.
fn build_payload(
    job_id: &JobId,
    status: JobStatus,
    body_key: &str,
    body: &str,
    metadata: Map<String, Value>,
) -> Value {
    let mut payload = metadata;
    payload.insert("jobId".to_string(), Value::from(job_id.as_str()));
    payload.insert("requestId".to_string(), Value::from(job_id.as_str()));
    payload.insert("batchId".to_string(), Value::from(job_id.as_str()));
    payload.insert("status".to_string(), Value::from(status.as_str()));
    payload.insert(
        "timestamp".to_string(),
        Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    payload.insert(body_key.to_string(), Value::from(body));
    Value::Object(payload)
}

#[async_trait]
impl CallbackDispatcher for HttpCallbackDispatcher {
    async fn send_completion(
        &self,
        url: &str,
        job_id: &JobId,
        text: &str,
        metadata: Map<String, Value>,
    ) -> DeliveryOutcome {
        let payload = build_payload(job_id, JobStatus::Completed, "response", text, metadata);
        self.deliver(url, job_id, payload).await
    }

    async fn send_failure(
        &self,
        url: &str,
        job_id: &JobId,
        error_message: &str,
        metadata: Map<String, Value>,
    ) -> DeliveryOutcome {
        let payload = build_payload(job_id, JobStatus::Failed, "error", error_message, metadata);
        self.deliver(url, job_id, payload).await
    }
}
