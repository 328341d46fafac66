#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use prompt_relay::application::ports::{
    CallbackDispatcher, DeliveryOutcome, JobTracker, LlmClient, LlmClientError,
};
use prompt_relay::application::services::{JobProcessor, RetryPolicy, UpstreamClient};
use prompt_relay::domain::{Generation, GenerationDefaults, GenerationRequest, JobId, Usage};
use prompt_relay::infrastructure::persistence::InMemoryJobTracker;
use prompt_relay::presentation::{AppState, ClientRateLimiter, Environment, create_router};

pub const TEST_API_KEY: &str = "relay-test-secret";

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5), Duration::from_millis(20))
}

pub fn generation(text: &str) -> Generation {
    Generation {
        text: text.to_string(),
        model: "claude-3-5-sonnet-20241022".to_string(),
        stop_reason: Some("end_turn".to_string()),
        usage: Usage {
            input_tokens: 12,
            output_tokens: 34,
        },
    }
}

pub fn api_error(status: u16) -> LlmClientError {
    LlmClientError::Api {
        status,
        message: format!("stubbed status {}", status),
        details: None,
    }
}

type Responder = dyn Fn(u32) -> Result<Generation, LlmClientError> + Send + Sync;

/// Provider stand-in answering each call through a closure of the 1-based
/// call number.
pub struct StubLlmClient {
    calls: AtomicU32,
    delay: Duration,
    respond: Box<Responder>,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl StubLlmClient {
    pub fn new(
        respond: impl Fn(u32) -> Result<Generation, LlmClientError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
            respond: Box::new(respond),
            last_request: Mutex::new(None),
        }
    }

    pub fn succeeding(text: &'static str) -> Self {
        Self::new(move |_| Ok(generation(text)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for StubLlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmClientError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap() = Some(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.respond)(call)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCallback {
    pub url: String,
    pub job_id: JobId,
    pub status: &'static str,
    pub body: String,
    pub metadata: Map<String, Value>,
}

/// Callback dispatcher that records every notification instead of sending it.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<RecordedCallback>>,
}

impl RecordingDispatcher {
    pub fn sent(&self) -> Vec<RecordedCallback> {
        self.sent.lock().unwrap().clone()
    }

    fn record(
        &self,
        url: &str,
        job_id: &JobId,
        status: &'static str,
        body: &str,
        metadata: Map<String, Value>,
    ) -> DeliveryOutcome {
        self.sent.lock().unwrap().push(RecordedCallback {
            url: url.to_string(),
            job_id: job_id.clone(),
            status,
            body: body.to_string(),
            metadata,
        });
        DeliveryOutcome::Delivered {
            status: 200,
            attempts: 1,
        }
    }
}

#[async_trait]
impl CallbackDispatcher for RecordingDispatcher {
    async fn send_completion(
        &self,
        url: &str,
        job_id: &JobId,
        text: &str,
        metadata: Map<String, Value>,
    ) -> DeliveryOutcome {
        self.record(url, job_id, "completed", text, metadata)
    }

    async fn send_failure(
        &self,
        url: &str,
        job_id: &JobId,
        error_message: &str,
        metadata: Map<String, Value>,
    ) -> DeliveryOutcome {
        self.record(url, job_id, "failed", error_message, metadata)
    }
}

pub fn upstream(llm: Arc<dyn LlmClient>) -> Arc<UpstreamClient> {
    Arc::new(UpstreamClient::new(
        llm,
        GenerationDefaults::default(),
        fast_policy(),
        Duration::from_secs(5),
    ))
}

pub struct TestApp {
    pub router: Router,
    pub tracker: Arc<InMemoryJobTracker>,
}

pub fn test_app_with(
    llm: Arc<dyn LlmClient>,
    callbacks: Arc<dyn CallbackDispatcher>,
    rate_limiter: ClientRateLimiter,
    general_rate_limiter: ClientRateLimiter,
    environment: Environment,
) -> TestApp {
    let tracker = Arc::new(InMemoryJobTracker::default());
    let job_tracker: Arc<dyn JobTracker> = tracker.clone();
    let processor = Arc::new(JobProcessor::new(
        Arc::clone(&job_tracker),
        upstream(llm),
        callbacks,
    ));
    let state = AppState::new(
        job_tracker,
        processor,
        TEST_API_KEY,
        rate_limiter,
        general_rate_limiter,
        environment,
    );

    TestApp {
        router: create_router(state),
        tracker,
    }
}

pub fn test_app(llm: Arc<dyn LlmClient>, callbacks: Arc<dyn CallbackDispatcher>) -> TestApp {
    test_app_with(
        llm,
        callbacks,
        ClientRateLimiter::new(100, Duration::from_secs(15 * 60)),
        ClientRateLimiter::new(200, Duration::from_secs(15 * 60)),
        Environment::Test,
    )
}

/// Serves `app` on an ephemeral local port until the sender is used or dropped.
pub async fn start_mock_server(app: Router) -> (String, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .ok();
    });

    (base_url, shutdown_tx)
}

/// An address nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
