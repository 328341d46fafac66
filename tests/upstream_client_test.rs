mod helpers;

use std::sync::Arc;
use std::time::Duration;

use prompt_relay::application::ports::LlmClientError;
use prompt_relay::application::services::{RetryPolicy, UpstreamClient};
use prompt_relay::domain::{GenerationDefaults, GenerationOptions};

use helpers::{StubLlmClient, api_error, fast_policy, generation, upstream};

#[tokio::test]
async fn given_two_server_errors_then_success_when_generating_then_succeeds_on_third_attempt() {
    let llm = Arc::new(StubLlmClient::new(|call| {
        if call <= 2 {
            Err(api_error(500))
        } else {
            Ok(generation("third time lucky"))
        }
    }));
    let client = upstream(llm.clone());

    let result = client.generate("hello", &GenerationOptions::default()).await;

    assert_eq!(result.unwrap().text, "third time lucky");
    assert_eq!(llm.calls(), 3);
}

#[tokio::test]
async fn given_bad_request_when_generating_then_fails_after_one_attempt() {
    let llm = Arc::new(StubLlmClient::new(|_| Err(api_error(400))));
    let client = upstream(llm.clone());

    let failure = client
        .generate("hello", &GenerationOptions::default())
        .await
        .unwrap_err();

    assert_eq!(llm.calls(), 1);
    assert_eq!(failure.attempts, 1);
    assert_eq!(failure.status_code, 400);
    assert_eq!(failure.error_class, "invalid_request_error");
}

#[tokio::test]
async fn given_unbuildable_request_when_generating_then_fails_after_one_attempt() {
    let llm = Arc::new(StubLlmClient::new(|_| {
        Err(LlmClientError::Request("builder error: relative URL without a base".to_string()))
    }));
    let client = upstream(llm.clone());

    let failure = client
        .generate("hello", &GenerationOptions::default())
        .await
        .unwrap_err();

    assert_eq!(llm.calls(), 1);
    assert_eq!(failure.attempts, 1);
    assert_eq!(failure.status_code, 500);
    assert_eq!(failure.error_class, "request_error");
}

#[tokio::test]
async fn given_persistent_rate_limit_when_generating_then_gives_up_after_four_attempts() {
    let llm = Arc::new(StubLlmClient::new(|_| Err(api_error(429))));
    let client = upstream(llm.clone());

    let failure = client
        .generate("hello", &GenerationOptions::default())
        .await
        .unwrap_err();

    assert_eq!(llm.calls(), 4);
    assert_eq!(failure.attempts, 4);
    assert_eq!(failure.status_code, 429);
    assert_eq!(failure.error_class, "rate_limit_error");
}

#[tokio::test]
async fn given_network_error_when_generating_then_retries_and_defaults_status_to_500() {
    let llm = Arc::new(StubLlmClient::new(|_| {
        Err(LlmClientError::Network("connection failed: reset".to_string()))
    }));
    let client = upstream(llm.clone());

    let failure = client
        .generate("hello", &GenerationOptions::default())
        .await
        .unwrap_err();

    assert_eq!(llm.calls(), 4);
    assert_eq!(failure.status_code, 500);
    assert_eq!(failure.error_class, "network_error");
}

#[tokio::test]
async fn given_slow_provider_when_ceiling_elapses_then_fails_without_retry() {
    let llm = Arc::new(
        StubLlmClient::succeeding("too late").with_delay(Duration::from_millis(500)),
    );
    let client = UpstreamClient::new(
        llm.clone(),
        GenerationDefaults::default(),
        fast_policy(),
        Duration::from_millis(50),
    );

    let failure = client
        .generate("hello", &GenerationOptions::default())
        .await
        .unwrap_err();

    assert_eq!(llm.calls(), 1);
    assert_eq!(failure.error_class, "timeout");
}

#[tokio::test]
async fn given_request_options_when_generating_then_provider_receives_resolved_request() {
    let llm = Arc::new(StubLlmClient::succeeding("ok"));
    let client = UpstreamClient::new(
        llm.clone(),
        GenerationDefaults::default(),
        RetryPolicy::new(0, Duration::ZERO, Duration::ZERO),
        Duration::from_secs(1),
    );
    let options = GenerationOptions {
        max_tokens: Some(64),
        system_prompt: Some("Reply tersely".to_string()),
        ..Default::default()
    };

    client.generate("hello", &options).await.unwrap();

    let request = llm.last_request().unwrap();
    assert_eq!(request.prompt, "hello");
    assert_eq!(request.model, "claude-3-5-sonnet-20241022");
    assert_eq!(request.max_tokens, 64);
    assert_eq!(request.system_prompt.as_deref(), Some("Reply tersely"));
}
