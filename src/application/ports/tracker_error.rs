use crate::domain::{JobId, JobTransitionError};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("job {id}: {source}")]
    InvalidTransition {
        id: JobId,
        #[source]
        source: JobTransitionError,
    },
}
