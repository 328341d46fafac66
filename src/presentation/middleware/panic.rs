use std::any::Any;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::presentation::errors::INTERNAL_ERROR_MESSAGE;

/// Converts a handler panic into a 500. Panic text is only exposed when
/// `expose_details` is set.
pub fn panic_response(err: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %detail, "Unhandled fault while processing request");

    let message = if expose_details {
        detail
    } else {
        INTERNAL_ERROR_MESSAGE.to_string()
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal Server Error",
            "message": message,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn given_production_when_panic_caught_then_message_is_generic() {
        let response = panic_response(Box::new("index out of bounds"), false);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn given_development_when_panic_caught_then_message_has_detail() {
        let response = panic_response(Box::new(String::from("tracker lock poisoned")), true);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal Server Error");
        assert_eq!(json["message"], "tracker lock poisoned");
    }
}
