use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::JobId;
use crate::presentation::errors::ApiError;
use crate::presentation::state::AppState;

use super::job_status::not_found;

#[tracing::instrument(skip(state))]
pub async fn delete_job_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = JobId::from_string(job_id);

    if state.job_tracker.delete(&id).await? {
        tracing::info!("Job record deleted");
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(not_found(&id))
    }
}
