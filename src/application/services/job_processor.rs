use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::application::ports::{CallbackDispatcher, DeliveryOutcome, JobTracker};
use crate::domain::{GenerationOptions, Job, JobId, JobStage, JobStatus, JobUpdate};

use super::UpstreamClient;

/// Everything the background continuation needs to finish one accepted job.
#[derive(Debug, Clone)]
pub struct JobSubmission {
    pub job_id: JobId,
    pub prompt: String,
    pub callback_url: String,
    pub options: GenerationOptions,
    pub pass_through: Map<String, Value>,
}

impl From<&Job> for JobSubmission {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            prompt: job.prompt.clone(),
            callback_url: job.callback_url.clone(),
            options: job.options.clone(),
            pass_through: job.pass_through.clone(),
        }
    }
}

/// Drives an accepted job from `pending` to a terminal state and notifies the
/// callback target. The only writer of the job's record after acceptance.
pub struct JobProcessor {
    job_tracker: Arc<dyn JobTracker>,
    upstream: Arc<UpstreamClient>,
    callbacks: Arc<dyn CallbackDispatcher>,
    stage_delay: Duration,
}

impl JobProcessor {
    pub fn new(
        job_tracker: Arc<dyn JobTracker>,
        upstream: Arc<UpstreamClient>,
        callbacks: Arc<dyn CallbackDispatcher>,
    ) -> Self {
        Self {
            job_tracker,
            upstream,
            callbacks,
            stage_delay: Duration::ZERO,
        }
    }

    /// Adds a cosmetic pause in the `analyzing` stage before the upstream call.
    pub fn with_stage_delay(mut self, stage_delay: Duration) -> Self {
        self.stage_delay = stage_delay;
        self
    }

    /// Hands the job off to its own task. Nothing awaits the handle on the
    /// request path; failures are logged inside the task.
    pub fn spawn(self: &Arc<Self>, submission: JobSubmission) -> JoinHandle<()> {
        let processor = Arc::clone(self);
        let span = tracing::info_span!("job", job_id = %submission.job_id);
        tokio::spawn(async move { processor.process(submission).await }.instrument(span))
    }

    pub async fn process(&self, submission: JobSubmission) {
        let job_id = &submission.job_id;
        tracing::info!("Starting background processing");

        self.transition(
            job_id,
            JobUpdate::status(JobStatus::Processing).with_stage(JobStage::Analyzing),
        )
        .await;

        if !self.stage_delay.is_zero() {
            tokio::time::sleep(self.stage_delay).await;
        }

        self.transition(job_id, JobUpdate::stage(JobStage::Generating))
            .await;

        let outcome = match self
            .upstream
            .generate(&submission.prompt, &submission.options)
            .await
        {
            Ok(generation) => {
                tracing::info!(
                    response_chars = generation.text.chars().count(),
                    "Generation completed"
                );

                let mut metadata = submission.pass_through.clone();
                metadata.insert(
                    "usage".to_string(),
                    serde_json::to_value(generation.usage).unwrap_or(Value::Null),
                );
                metadata.insert("model".to_string(), Value::from(generation.model.clone()));
                metadata.insert(
                    "stopReason".to_string(),
                    generation
                        .stop_reason
                        .clone()
                        .map(Value::from)
                        .unwrap_or(Value::Null),
                );

                let text = generation.text.clone();
                self.transition(
                    job_id,
                    JobUpdate::completed(generation).with_stage(JobStage::Delivering),
                )
                .await;

                self.callbacks
                    .send_completion(&submission.callback_url, job_id, &text, metadata)
                    .await
            }
            Err(failure) => {
                tracing::warn!(error = %failure, "Generation failed");

                let mut metadata = submission.pass_through.clone();
                metadata.insert(
                    "errorClass".to_string(),
                    Value::from(failure.error_class.clone()),
                );
                metadata.insert("statusCode".to_string(), Value::from(failure.status_code));

                self.transition(
                    job_id,
                    JobUpdate::failed(failure.message.clone()).with_stage(JobStage::Delivering),
                )
                .await;

                self.callbacks
                    .send_failure(&submission.callback_url, job_id, &failure.message, metadata)
                    .await
            }
        };

        match &outcome {
            DeliveryOutcome::Delivered { status, attempts } => {
                tracing::info!(status = status, attempts = attempts, "Callback delivered");
            }
            DeliveryOutcome::Failed {
                error, attempts, ..
            } => {
                tracing::error!(
                    error = %error,
                    attempts = attempts,
                    callback_url = %submission.callback_url,
                    "Callback delivery abandoned"
                );
            }
        }

        self.transition(job_id, JobUpdate::stage(JobStage::Finished))
            .await;
    }

    async fn transition(&self, job_id: &JobId, update: JobUpdate) {
        tracing::debug!(
            status = ?update.status.map(|s| s.as_str()),
            stage = ?update.stage.map(|s| s.as_str()),
            "Job status transition"
        );
        if let Err(e) = self.job_tracker.update(job_id, update).await {
            tracing::warn!(error = %e, "Failed to update job record");
        }
    }
}
