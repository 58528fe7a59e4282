//! Router assembly: generation and evaluation endpoints, CORS, upload limit and HTTP tracing.

use std::sync::Arc;

use axum::{
  extract::DefaultBodyLimit,
  routing::{get, post},
  Router,
};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Largest accepted request body (audio uploads included).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router with:
/// - liveness at `/`
/// - exercise generation under `/api/generate/...`
/// - evaluation under `/api/evaluate/...` and `/api/transcribe-and-evaluate`
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/", get(http::http_index))
    // Generation
    .route("/api/generate/:task", get(http::http_generate_text))
    .route("/api/generate/reorder-paragraph", get(http::http_generate_reorder))
    .route("/api/generate/describe-image", get(http::http_generate_describe_image))
    .route("/api/generate/mcsa", get(http::http_generate_mcsa))
    .route("/api/generate/answer-short-question", get(http::http_generate_short_answer))
    // Evaluation
    .route("/api/evaluate/spoken-response", post(http::http_evaluate_spoken))
    .route("/api/evaluate/essay", post(http::http_evaluate_essay))
    .route("/api/evaluate/swt", post(http::http_evaluate_swt))
    .route("/api/transcribe-and-evaluate", post(http::http_transcribe_and_evaluate))
    .fallback(http::http_not_found)
    // State + body limit + CORS + HTTP tracing
    .with_state(state)
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .layer(
      CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any),
    )
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}
