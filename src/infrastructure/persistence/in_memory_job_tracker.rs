use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::application::ports::{JobTracker, TrackerError};
use crate::domain::{Job, JobId, JobUpdate};

pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Job records held in process memory. Lost on exit.
pub struct InMemoryJobTracker {
    jobs: RwLock<HashMap<JobId, Job>>,
    retention: Duration,
}

impl InMemoryJobTracker {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention,
        }
    }
}

impl Default for InMemoryJobTracker {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_RETENTION_HOURS))
    }
}

#[async_trait]
impl JobTracker for InMemoryJobTracker {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: Job) -> Result<(), TrackerError> {
        let mut jobs = self.jobs.write().await;
        if jobs.insert(job.id.clone(), job).is_some() {
            tracing::debug!("Replaced existing job record");
        }
        Ok(())
    }

    #[instrument(skip(self, update), fields(job_id = %id))]
    async fn update(&self, id: &JobId, update: JobUpdate) -> Result<(), TrackerError> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(id) else {
            tracing::debug!("Update for unknown job ignored");
            return Ok(());
        };

        job.apply(update, Utc::now())
            .map_err(|source| TrackerError::InvalidTransition {
                id: id.clone(),
                source,
            })
    }

    async fn get(&self, id: &JobId) -> Result<Option<Job>, TrackerError> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &JobId) -> Result<bool, TrackerError> {
        Ok(self.jobs.write().await.remove(id).is_some())
    }

    async fn cleanup(&self, now: DateTime<Utc>) -> Result<usize, TrackerError> {
        let cutoff = now - self.retention;
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.created_at >= cutoff);
        Ok(before - jobs.len())
    }

    async fn count(&self) -> Result<usize, TrackerError> {
        Ok(self.jobs.read().await.len())
    }
}
