mod in_memory_job_tracker;

pub use in_memory_job_tracker::{DEFAULT_RETENTION_HOURS, InMemoryJobTracker};
