mod delete_job;
mod fallback;
mod generate;
mod health;
mod job_status;

pub use delete_job::delete_job_handler;
pub use fallback::not_found_handler;
pub use generate::{GenerateAccepted, GenerateRequest, generate_handler};
pub use health::{HealthResponse, health_handler};
pub use job_status::{JobStatusResponse, job_status_handler};
