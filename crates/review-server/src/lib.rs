//! Review Server Library
//!
//! HTTP surface for Stockfish-backed review:
//! - `POST /api/review/evaluate` - one position
//! - `POST /api/review/analyze` - sampled game review from PGN
//! - `GET /api/review/stream` - live evaluation as server-sent events
//! - `GET /health`

pub mod api;
pub mod config;
pub mod middleware;

use axum::routing::{get, post};
use axum::Router;
use chess_analysis::Analyzer;
use tower_http::trace::TraceLayer;

use middleware::{timing_layer, SlowRequestThreshold};

/// Application state shared across all handlers.
#[derive(Clone, Default)]
pub struct AppState {
    /// Spawns one engine process per request.
    pub analyzer: Analyzer,
    /// Warning threshold for the timing middleware.
    pub slow_request: SlowRequestThreshold,
}

/// Health check endpoint.
///
/// Returns "ok" to indicate the server is running.
async fn health() -> &'static str {
    "ok"
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let slow_request = state.slow_request;
    Router::new()
        .route("/health", get(health))
        .route("/api/review/evaluate", post(api::review::evaluate))
        .route("/api/review/analyze", post(api::review::analyze))
        .route("/api/review/stream", get(api::review::stream))
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(slow_request, timing_layer))
        .layer(TraceLayer::new_for_http())
}
