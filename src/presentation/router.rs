use std::any::Any as PanicPayload;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method, header};
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    delete_job_handler, generate_handler, health_handler, job_status_handler, not_found_handler,
};
use crate::presentation::middleware::{
    API_KEY_HEADER, api_key_middleware, general_rate_limit_middleware, panic_response,
    rate_limit_middleware,
};
use crate::presentation::state::AppState;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const CORS_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
        .max_age(CORS_MAX_AGE);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let expose_details = state.environment.exposes_error_details();
    let catch_panic = CatchPanicLayer::custom(move |err: Box<dyn PanicPayload + Send + 'static>| {
        panic_response(err, expose_details)
    });

    // Rate limiting runs before authentication.
    let submit = Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/api/claude", post(generate_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let admin = Router::new()
        .route("/api/jobs/{job_id}", delete(delete_job_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/status/{job_id}", get(job_status_handler))
        .merge(submit)
        .merge(admin)
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            general_rate_limit_middleware,
        ))
        .layer(catch_panic)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
