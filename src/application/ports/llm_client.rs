use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Generation, GenerationRequest};

/// A single attempt against the text-generation provider. Retries and the
/// hard ceiling are layered on top by `UpstreamClient`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmClientError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmClientError {
    #[error("api request failed with status {status}: {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("request could not be built: {0}")]
    Request(String),
}

impl LlmClientError {
    /// Rate limiting, server faults and transport failures are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmClientError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmClientError::Network(_) => true,
            LlmClientError::Timeout(_)
            | LlmClientError::InvalidResponse(_)
            | LlmClientError::Request(_) => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            LlmClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            LlmClientError::Api { status: 429, .. } => "rate_limit_error",
            LlmClientError::Api { status, .. } if *status >= 500 => "api_error",
            LlmClientError::Api { .. } => "invalid_request_error",
            LlmClientError::Network(_) => "network_error",
            LlmClientError::Timeout(_) => "timeout",
            LlmClientError::InvalidResponse(_) => "invalid_response",
            LlmClientError::Request(_) => "request_error",
        }
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            LlmClientError::Api { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}
