use axum::http::{Method, Uri};

use crate::presentation::errors::ApiError;

pub async fn not_found_handler(method: Method, uri: Uri) -> ApiError {
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
