mod callback_dispatcher;
mod job_tracker;
mod llm_client;
mod tracker_error;

pub use callback_dispatcher::{CallbackDispatcher, DeliveryOutcome};
pub use job_tracker::JobTracker;
pub use llm_client::{LlmClient, LlmClientError};
pub use tracker_error::TrackerError;
