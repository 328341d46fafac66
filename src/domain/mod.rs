mod generation;
mod job;
mod job_id;
mod job_status;
mod supplier;

pub use generation::{Generation, GenerationDefaults, GenerationOptions, GenerationRequest, Usage};
pub use job::{Job, JobResult, JobTransitionError, JobUpdate};
pub use job_id::JobId;
pub use job_status::{JobStage, JobStatus};
pub use supplier::detect_supplier;
