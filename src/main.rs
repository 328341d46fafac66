use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use prompt_relay::application::ports::{CallbackDispatcher, JobTracker, LlmClient};
use prompt_relay::application::services::{JobProcessor, UpstreamClient, spawn_tracker_sweeper};
use prompt_relay::infrastructure::llm::AnthropicClient;
use prompt_relay::infrastructure::observability::{TracingConfig, init_tracing};
use prompt_relay::infrastructure::persistence::InMemoryJobTracker;
use prompt_relay::infrastructure::webhook::HttpCallbackDispatcher;
use prompt_relay::presentation::{
    AppState, ClientRateLimiter, Environment, Settings, create_router, spawn_rate_limit_pruner,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".to_string())
        .try_into()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let settings = match Settings::load(environment) {
        Ok(settings) => {
            init_tracing(&settings.tracing_config(environment));
            settings
        }
        Err(e) => {
            init_tracing(&TracingConfig::default());
            tracing::error!(error = %e, "Refusing to start with invalid configuration");
            return Err(e).context("failed to load settings");
        }
    };

    let job_tracker: Arc<dyn JobTracker> =
        Arc::new(InMemoryJobTracker::new(settings.tracker.retention()));

    let llm_client: Arc<dyn LlmClient> = Arc::new(AnthropicClient::new(
        &settings.llm.base_url,
        &settings.llm.api_key,
        &settings.llm.api_version,
    ));
    let upstream = Arc::new(UpstreamClient::new(
        llm_client,
        settings.llm.generation_defaults(),
        settings.llm.retry.policy(),
        settings.llm.timeout(),
    ));

    let callbacks: Arc<dyn CallbackDispatcher> = Arc::new(
        HttpCallbackDispatcher::new(
            settings.callback.timeout(),
            &settings.callback.user_agent,
            settings.callback.retry.policy(),
        )
        .context("failed to build callback HTTP client")?,
    );

    let job_processor = Arc::new(
        JobProcessor::new(Arc::clone(&job_tracker), upstream, callbacks)
            .with_stage_delay(settings.processing.stage_delay()),
    );

    let sweeper = spawn_tracker_sweeper(
        Arc::clone(&job_tracker),
        settings.tracker.cleanup_interval(),
    );

    let rate_limiter = ClientRateLimiter::new(
        settings.rate_limit.max_requests,
        settings.rate_limit.window(),
    );
    let general_rate_limiter = ClientRateLimiter::new(
        settings.rate_limit.general_max_requests,
        settings.rate_limit.window(),
    );

    let state = AppState::new(
        job_tracker,
        job_processor,
        settings.auth.api_secret_key.as_str(),
        rate_limiter,
        general_rate_limiter,
        environment,
    );
    let pruner = spawn_rate_limit_pruner(
        vec![
            Arc::clone(&state.rate_limiter),
            Arc::clone(&state.general_rate_limiter),
        ],
        settings.rate_limit.window(),
    );
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid server address")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        address = %addr,
        environment = %environment,
        model = %settings.llm.default_model,
        "Prompt relay listening"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    pruner.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
