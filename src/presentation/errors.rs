use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::application::ports::TrackerError;

pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Synchronous failures surfaced to the caller as `{error, message}` JSON.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("X-API-Key header is missing")]
    MissingApiKey,
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("You have exceeded the rate limit. Please try again later.")]
    RateLimited { retry_after_secs: u64 },
    #[error("Cannot {method} {path}")]
    RouteNotFound { method: String, path: String },
    #[error("An internal error occurred")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MissingApiKey => StatusCode::UNAUTHORIZED,
            ApiError::InvalidApiKey => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "Validation error",
            ApiError::PayloadTooLarge(_) => "Payload Too Large",
            ApiError::MissingApiKey => "Authentication required",
            ApiError::InvalidApiKey => "Authentication failed",
            ApiError::RateLimited { .. } => "Too many requests",
            ApiError::RouteNotFound { .. } => "Not Found",
            ApiError::Internal => "Internal Server Error",
        }
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        tracing::error!(error = %err, "Job tracker operation failed");
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.label(),
            "message": self.to_string(),
        });

        if let ApiError::RateLimited { retry_after_secs } = self {
            body["retryAfter"] = json!(retry_after_secs);
            let mut response = (status, Json(body)).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            return response;
        }

        (status, Json(body)).into_response()
    }
}
