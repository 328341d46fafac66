use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::ports::{LlmClient, LlmClientError};
use crate::domain::{Generation, GenerationRequest, Usage};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client. One call per `generate`; retries live in
/// `UpstreamClient`.
pub struct AnthropicClient {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
}

impl AnthropicClient {
    pub fn new(base_url: &str, api_key: &str, api_version: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            api_version: api_version.to_string(),
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [RequestMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    temperature: f32,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ResponseUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct ResponseUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Connection, timeout and send-phase failures are transient. Anything else
/// (bad endpoint URL, redirect policy, body encoding) fails the same way on
/// every attempt.
fn transport_error(e: reqwest::Error) -> LlmClientError {
    if e.is_timeout() {
        LlmClientError::Network(format!("timed out: {}", e))
    } else if e.is_connect() {
        LlmClientError::Network(format!("connection failed: {}", e))
    } else if e.is_request() {
        LlmClientError::Network(format!("request failed: {}", e))
    } else {
        LlmClientError::Request(e.to_string())
    }
}

fn error_message(status: reqwest::StatusCode, details: Option<&serde_json::Value>) -> String {
    details
        .and_then(|d| d.pointer("/error/message"))
        .and_then(|m| m.as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmClientError> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: [RequestMessage {
                role: "user",
                content: &request.prompt,
            }],
            system: request.system_prompt.as_deref(),
            temperature: request.temperature,
        };

        tracing::debug!(endpoint = %self.endpoint, model = %request.model, "Sending messages request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let details = serde_json::from_str::<serde_json::Value>(&raw).ok();
            return Err(LlmClientError::Api {
                status: status.as_u16(),
                message: error_message(status, details.as_ref()),
                details,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        Ok(Generation {
            text,
            model: parsed.model,
            stop_reason: parsed.stop_reason,
            usage: Usage {
                input_tokens: parsed.usage.input_tokens,
                output_tokens: parsed.usage.output_tokens,
            },
        })
    }
}
