use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Job, JobId, JobUpdate};

use super::TrackerError;

/// Process-scoped store of job records, shared between the request handler,
/// the background continuation and the status endpoint.
#[async_trait]
pub trait JobTracker: Send + Sync {
    /// Inserts `job`, silently replacing any record with the same id.
    async fn create(&self, job: Job) -> Result<(), TrackerError>;

    /// Merges `update` into an existing record. Absent ids are a no-op.
    async fn update(&self, id: &JobId, update: JobUpdate) -> Result<(), TrackerError>;

    async fn get(&self, id: &JobId) -> Result<Option<Job>, TrackerError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &JobId) -> Result<bool, TrackerError>;

    /// Removes every record created before the retention window ending at
    /// `now`. Returns the number of evicted records.
    async fn cleanup(&self, now: DateTime<Utc>) -> Result<usize, TrackerError>;

    async fn count(&self) -> Result<usize, TrackerError>;
}
