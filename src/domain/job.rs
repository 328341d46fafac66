use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{Generation, GenerationOptions, JobId, JobStage, JobStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    Completed(Generation),
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub stage: JobStage,
    pub progress: u8,
    pub prompt: String,
    pub callback_url: String,
    pub options: GenerationOptions,
    /// Caller fields echoed back in the callback payload.
    pub pass_through: Map<String, Value>,
    pub result: Option<JobResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        id: JobId,
        prompt: String,
        callback_url: String,
        options: GenerationOptions,
        pass_through: Map<String, Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            stage: JobStage::Received,
            progress: JobStage::Received.progress(),
            prompt,
            callback_url,
            options,
            pass_through,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges `update` into the record. Validation happens before any field is
    /// written, so a rejected update leaves the job untouched.
    pub fn apply(&mut self, update: JobUpdate, now: DateTime<Utc>) -> Result<(), JobTransitionError> {
        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err(JobTransitionError::Regression {
                    from: self.status,
                    to: next,
                });
            }
        }
        if update.result.is_some() && self.result.is_some() {
            return Err(JobTransitionError::ResultAlreadySet);
        }

        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(stage) = update.stage {
            self.stage = stage;
        }
        if let Some(progress) = update.progress {
            self.progress = progress.min(100);
        }
        if let Some(result) = update.result {
            self.result = Some(result);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn response_text(&self) -> Option<&str> {
        match &self.result {
            Some(JobResult::Completed(generation)) => Some(&generation.text),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.result {
            Some(JobResult::Failed { error }) => Some(error),
            _ => None,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.pass_through_str("filename")
            .or_else(|| self.pass_through_str("fileName"))
    }

    pub fn result_url(&self) -> Option<&str> {
        if !self.status.is_terminal() {
            return None;
        }
        self.pass_through_str("resultUrl")
    }

    fn pass_through_str(&self, key: &str) -> Option<&str> {
        self.pass_through.get(key).and_then(Value::as_str)
    }
}

/// Partial update merged into a [`Job`]; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub stage: Option<JobStage>,
    pub progress: Option<u8>,
    pub result: Option<JobResult>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Sets the stage together with its default progress percentage.
    pub fn stage(stage: JobStage) -> Self {
        Self {
            stage: Some(stage),
            progress: Some(stage.progress()),
            ..Default::default()
        }
    }

    pub fn completed(generation: Generation) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            result: Some(JobResult::Completed(generation)),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            result: Some(JobResult::Failed {
                error: error.into(),
            }),
            ..Default::default()
        }
    }

    pub fn with_stage(mut self, stage: JobStage) -> Self {
        self.stage = Some(stage);
        self.progress = Some(stage.progress());
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobTransitionError {
    #[error("status cannot move from {from} to {to}")]
    Regression { from: JobStatus, to: JobStatus },
    #[error("result already recorded")]
    ResultAlreadySet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Usage;

    fn job() -> Job {
        Job::new(
            JobId::from_string("job-1"),
            "hello".to_string(),
            "https://example.com/cb".to_string(),
            GenerationOptions::default(),
            Map::new(),
        )
    }

    fn generation(text: &str) -> Generation {
        Generation {
            text: text.to_string(),
            model: "claude".to_string(),
            stop_reason: Some("end_turn".to_string()),
            usage: Usage::default(),
        }
    }

    #[test]
    fn given_new_job_when_created_then_is_pending_and_received() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.stage, JobStage::Received);
        assert_eq!(job.progress, 0);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.result.is_none());
    }

    #[test]
    fn given_processing_update_when_applied_then_status_and_timestamp_change() {
        let mut job = job();
        let later = job.updated_at + chrono::Duration::seconds(5);

        job.apply(
            JobUpdate::status(JobStatus::Processing).with_stage(JobStage::Analyzing),
            later,
        )
        .unwrap();

        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.stage, JobStage::Analyzing);
        assert_eq!(job.progress, 10);
        assert_eq!(job.updated_at, later);
    }

    #[test]
    fn given_processing_job_when_reverting_to_pending_then_rejected_untouched() {
        let mut job = job();
        job.apply(JobUpdate::status(JobStatus::Processing), Utc::now())
            .unwrap();
        let before = job.updated_at;

        let err = job
            .apply(
                JobUpdate::status(JobStatus::Pending).with_stage(JobStage::Finished),
                before + chrono::Duration::seconds(1),
            )
            .unwrap_err();

        assert!(matches!(err, JobTransitionError::Regression { .. }));
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.stage, JobStage::Received);
        assert_eq!(job.updated_at, before);
    }

    #[test]
    fn given_completed_job_when_result_overwritten_then_rejected() {
        let mut job = job();
        job.apply(JobUpdate::completed(generation("first")), Utc::now())
            .unwrap();

        let err = job
            .apply(JobUpdate::completed(generation("second")), Utc::now())
            .unwrap_err();

        assert_eq!(err, JobTransitionError::ResultAlreadySet);
        assert_eq!(job.response_text(), Some("first"));
    }

    #[test]
    fn given_terminal_job_when_stage_advances_then_stage_is_merged() {
        let mut job = job();
        job.apply(JobUpdate::failed("boom"), Utc::now()).unwrap();

        job.apply(JobUpdate::stage(JobStage::Finished), Utc::now())
            .unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.stage, JobStage::Finished);
        assert_eq!(job.progress, 100);
        assert_eq!(job.error_message(), Some("boom"));
    }

    #[test]
    fn given_pass_through_filename_when_reading_then_accepts_both_spellings() {
        let mut job = job();
        job.pass_through
            .insert("fileName".to_string(), Value::from("ups-mai.pdf"));
        assert_eq!(job.filename(), Some("ups-mai.pdf"));

        job.pass_through
            .insert("filename".to_string(), Value::from("dhl.pdf"));
        assert_eq!(job.filename(), Some("dhl.pdf"));
    }

    #[test]
    fn given_result_url_when_job_not_terminal_then_hidden() {
        let mut job = job();
        job.pass_through.insert(
            "resultUrl".to_string(),
            Value::from("https://example.com/r/1"),
        );
        assert_eq!(job.result_url(), None);

        job.apply(JobUpdate::failed("nope"), Utc::now()).unwrap();
        assert_eq!(job.result_url(), Some("https://example.com/r/1"));
    }
}
