use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::application::ports::{LlmClient, LlmClientError};
use crate::domain::{Generation, GenerationDefaults, GenerationOptions, GenerationRequest};

use super::RetryPolicy;

/// Hard ceiling for one upstream attempt.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Normalized shape of an upstream failure once retries are exhausted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct UpstreamFailure {
    pub message: String,
    pub error_class: String,
    pub status_code: u16,
    pub details: Option<Value>,
    pub attempts: u32,
}

impl UpstreamFailure {
    fn from_error(error: &LlmClientError, attempts: u32) -> Self {
        Self {
            message: error.to_string(),
            error_class: error.error_class().to_string(),
            status_code: error.status_code().unwrap_or(500),
            details: error.details().cloned(),
            attempts,
        }
    }
}

/// One logical "generate" call against the provider. Every attempt is bounded
/// by a hard timeout; transient failures are retried.
pub struct UpstreamClient {
    llm_client: Arc<dyn LlmClient>,
    defaults: GenerationDefaults,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(
        llm_client: Arc<dyn LlmClient>,
        defaults: GenerationDefaults,
        retry_policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            llm_client,
            defaults,
            retry_policy,
            timeout,
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, UpstreamFailure> {
        let request = GenerationRequest::resolve(prompt, options, &self.defaults);

        tracing::info!(
            model = %request.model,
            max_tokens = request.max_tokens,
            prompt_chars = request.prompt.chars().count(),
            "Starting upstream generation"
        );

        let retried = self
            .retry_policy
            .run(
                |attempt| self.attempt(&request, attempt),
                LlmClientError::is_retryable,
            )
            .await;

        match retried.result {
            Ok(generation) => {
                tracing::info!(
                    model = %generation.model,
                    attempts = retried.attempts,
                    input_tokens = generation.usage.input_tokens,
                    output_tokens = generation.usage.output_tokens,
                    "Upstream generation succeeded"
                );
                Ok(generation)
            }
            Err(e) => {
                let failure = UpstreamFailure::from_error(&e, retried.attempts);
                tracing::error!(
                    error = %failure.message,
                    error_class = %failure.error_class,
                    status_code = failure.status_code,
                    attempts = failure.attempts,
                    "Upstream generation failed"
                );
                Err(failure)
            }
        }
    }

    async fn attempt(
        &self,
        request: &GenerationRequest,
        attempt: u32,
    ) -> Result<Generation, LlmClientError> {
        let result = match tokio::time::timeout(self.timeout, self.llm_client.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmClientError::Timeout(self.timeout)),
        };

        if let Err(e) = &result {
            tracing::warn!(
                attempt = attempt,
                error = %e,
                error_class = e.error_class(),
                retryable = e.is_retryable(),
                "Upstream attempt failed"
            );
        }
        result
    }
}
