use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::presentation::errors::ApiError;
use crate::presentation::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests without the shared API key: 401 when absent, 403 when wrong.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let verdict = match request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        None => Err(ApiError::MissingApiKey),
        Some(key) if !keys_match(key, &state.api_key) => Err(ApiError::InvalidApiKey),
        Some(_) => Ok(()),
    };

    if let Err(e) = verdict {
        tracing::warn!(path = %request.uri().path(), reason = %e, "Authentication failed");
        return Err(e);
    }

    Ok(next.run(request).await)
}

/// Comparison time does not depend on where the keys first differ.
fn keys_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
