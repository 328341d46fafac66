mod job_processor;
mod retry_policy;
mod tracker_sweeper;
mod upstream_client;

pub use job_processor::{JobProcessor, JobSubmission};
pub use retry_policy::{Retried, RetryPolicy};
pub use tracker_sweeper::{DEFAULT_SWEEP_INTERVAL, spawn_tracker_sweeper, sweep_once};
pub use upstream_client::{DEFAULT_UPSTREAM_TIMEOUT, UpstreamClient, UpstreamFailure};
