use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::application::services::JobSubmission;
use crate::domain::{GenerationOptions, Job, JobId};
use crate::infrastructure::observability::sanitize_prompt;
use crate::presentation::errors::ApiError;
use crate::presentation::state::AppState;

/// Body fields consumed by the relay itself; everything else is passed through.
const RESERVED_FIELDS: [&str; 5] = ["prompt", "callbackUrl", "webhookUrl", "requestId", "options"];

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub job_id: Option<JobId>,
    pub prompt: String,
    pub callback_url: String,
    pub options: GenerationOptions,
    pub pass_through: Map<String, Value>,
}

impl GenerateRequest {
    pub fn parse(body: Value) -> Result<Self, ApiError> {
        let Value::Object(mut fields) = body else {
            return Err(invalid("Request body must be a JSON object"));
        };

        let prompt = match fields.remove("prompt") {
            Some(Value::String(p)) if !p.trim().is_empty() => p,
            Some(Value::String(_)) => return Err(invalid("prompt must not be empty")),
            Some(Value::Null) | None => return Err(invalid("prompt is required")),
            Some(_) => return Err(invalid("prompt must be a string")),
        };

        let callback = fields.remove("callbackUrl");
        let webhook = fields.remove("webhookUrl");
        let callback_url = match callback.filter(|v| !v.is_null()).or(webhook) {
            Some(Value::String(u)) => validate_callback_url(u.trim())?,
            Some(Value::Null) | None => return Err(invalid("callbackUrl is required")),
            Some(_) => return Err(invalid("callbackUrl must be a string")),
        };

        let job_id = match fields.remove("requestId") {
            Some(Value::String(id)) if !id.trim().is_empty() => Some(JobId::from_string(id.trim())),
            Some(Value::String(_)) | Some(Value::Null) | None => None,
            Some(_) => return Err(invalid("requestId must be a string")),
        };

        let options = match fields.remove("options") {
            Some(Value::Null) | None => GenerationOptions::default(),
            Some(raw) => serde_json::from_value(raw)
                .map_err(|e| invalid(&format!("options are invalid: {}", e)))?,
        };

        for key in RESERVED_FIELDS {
            fields.remove(key);
        }

        Ok(Self {
            job_id,
            prompt,
            callback_url,
            options,
            pass_through: fields,
        })
    }
}

fn validate_callback_url(raw: &str) -> Result<String, ApiError> {
    let url = Url::parse(raw).map_err(|_| invalid("callbackUrl must be a valid URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("callbackUrl must use http or https"));
    }
    Ok(raw.to_string())
}

fn invalid(message: &str) -> ApiError {
    ApiError::Validation(message.to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAccepted {
    pub job_id: String,
    pub request_id: String,
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

/// Accepts a generation job. The job record exists before the response is
/// sent, so the returned id can be polled straight away.
#[tracing::instrument(skip(state, payload))]
pub async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Rejected unreadable request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::Validation(rejection.body_text())
        }
    })?;

    let request = GenerateRequest::parse(body).inspect_err(|e| {
        tracing::warn!(error = %e, "Request validation failed");
    })?;

    let job = Job::new(
        request.job_id.unwrap_or_default(),
        request.prompt,
        request.callback_url,
        request.options,
        request.pass_through,
    );
    let submission = JobSubmission::from(&job);
    let job_id = job.id.to_string();

    tracing::info!(
        job_id = %job_id,
        prompt = %sanitize_prompt(&job.prompt),
        prompt_chars = job.prompt.chars().count(),
        "Job accepted"
    );

    state.job_tracker.create(job).await?;
    state.job_processor.spawn(submission);

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateAccepted {
            request_id: job_id.clone(),
            job_id,
            status: "received",
            message: "Request received, processing started",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    ))
}
