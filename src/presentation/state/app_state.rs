use std::sync::Arc;

use crate::application::ports::JobTracker;
use crate::application::services::JobProcessor;
use crate::presentation::config::Environment;
use crate::presentation::middleware::ClientRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub job_tracker: Arc<dyn JobTracker>,
    pub job_processor: Arc<JobProcessor>,
    /// Shared secret expected in the `x-api-key` header.
    pub api_key: Arc<str>,
    /// Budget for job submissions.
    pub rate_limiter: Arc<ClientRateLimiter>,
    /// Budget applied to every route.
    pub general_rate_limiter: Arc<ClientRateLimiter>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(
        job_tracker: Arc<dyn JobTracker>,
        job_processor: Arc<JobProcessor>,
        api_key: impl Into<Arc<str>>,
        rate_limiter: ClientRateLimiter,
        general_rate_limiter: ClientRateLimiter,
        environment: Environment,
    ) -> Self {
        Self {
            job_tracker,
            job_processor,
            api_key: api_key.into(),
            rate_limiter: Arc::new(rate_limiter),
            general_rate_limiter: Arc::new(general_rate_limiter),
            environment,
        }
    }
}
