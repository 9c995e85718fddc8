//! API route definitions.

use axum::http::{Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::error::ApiError;
use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS for local development: the dashboard frontend may be
    // served from a different local port.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let api_routes = Router::new()
        .route("/list", get(handlers::list_records))
        .route("/stream", get(handlers::stream_records))
        .route("/submit", post(handlers::submit_message))
        .route("/health", get(handlers::health))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .fallback(fallback)
        .layer(cors)
        .layer(trace_layer)
}

/// Uniform JSON 404 for anything outside the API surface.
async fn fallback() -> ApiError {
    ApiError::not_found("Not found")
}
