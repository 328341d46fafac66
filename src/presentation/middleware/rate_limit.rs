use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::presentation::errors::ApiError;
use crate::presentation::state::AppState;

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Per-client request budget of `max_requests` per `window`, replenished
/// gradually across the window.
pub struct ClientRateLimiter {
    limiter: RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
    clock: DefaultClock,
}

impl ClientRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);
        let clock = DefaultClock::default();

        Self {
            limiter: RateLimiter::dashmap_with_clock(quota, &clock),
            clock,
        }
    }

    /// Consumes one request for `client`, or returns how long to wait.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        self.limiter
            .check_key(&client.to_string())
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Forgets clients whose budget has fully refilled. Returns how many
    /// clients are still tracked.
    pub fn prune(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Prunes idle clients from every limiter on a fixed interval.
pub fn spawn_rate_limit_pruner(
    limiters: Vec<Arc<ClientRateLimiter>>,
    every: Duration,
) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let remaining: usize = limiters.iter().map(|l| l.prune()).sum();
            tracing::debug!(tracked_clients = remaining, "Pruned rate limiter state");
        }
    })
}

/// The relay sits behind exactly one proxy hop, so the client is the entry
/// that proxy appended last. Earlier entries are caller-controlled.
fn client_key(request: &Request) -> String {
    request
        .headers()
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(limiter: &ClientRateLimiter, scope: &'static str, request: Request, next: Next) -> Response {
    let client = client_key(&request);

    match limiter.check(&client) {
        Ok(()) => next.run(request).await,
        Err(wait) => {
            let retry_after_secs = wait.as_secs_f64().ceil().max(1.0) as u64;
            tracing::warn!(
                client = %client,
                scope = scope,
                path = %request.uri().path(),
                retry_after_secs = retry_after_secs,
                "Rate limit exceeded"
            );
            ApiError::RateLimited { retry_after_secs }.into_response()
        }
    }
}

/// Budget for job submissions.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state.rate_limiter, "submit", request, next).await
}

/// Budget shared by every route, public polling included.
pub async fn general_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state.general_rate_limiter, "general", request, next).await
}
