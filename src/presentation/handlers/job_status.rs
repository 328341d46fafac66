use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::json;

use crate::domain::{Job, JobId, detect_supplier};
use crate::presentation::errors::ApiError;
use crate::presentation::state::AppState;

/// Read-only view of a job for pollers. Never carries the prompt or the
/// generated text, only their lengths.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub batch_id: String,
    pub status: &'static str,
    pub stage: &'static str,
    pub progress: u8,
    pub prompt_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Job> for JobStatusResponse {
    fn from(job: &Job) -> Self {
        let filename = job.filename().map(str::to_string);
        Self {
            job_id: job.id.to_string(),
            batch_id: job.id.to_string(),
            status: job.status.as_str(),
            stage: job.stage.as_str(),
            progress: job.progress,
            prompt_length: job.prompt.chars().count(),
            response_length: job.response_text().map(|t| t.chars().count()),
            supplier: filename.as_deref().and_then(detect_supplier),
            filename,
            result_url: job.result_url().map(str::to_string),
            error: job.error_message().map(str::to_string),
            created_at: job.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            updated_at: job.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = JobId::from_string(job_id);

    match state.job_tracker.get(&id).await? {
        Some(job) => Ok((StatusCode::OK, Json(JobStatusResponse::from(&job))).into_response()),
        None => {
            tracing::debug!("Status requested for unknown job");
            Ok(not_found(&id))
        }
    }
}

pub(super) fn not_found(id: &JobId) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "jobId": id.as_str(),
            "status": "not_found",
        })),
    )
        .into_response()
}
