//! Request timing middleware.
//!
//! Logs the duration of each HTTP request. Engine-backed endpoints are
//! expected to take a while, so the warning threshold is configurable.

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

/// Requests taking longer than this are logged as warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowRequestThreshold(pub Duration);

impl Default for SlowRequestThreshold {
    fn default() -> Self {
        Self(Duration::from_millis(100))
    }
}

/// Middleware that logs request timing.
///
/// Streaming responses are timed until their headers are sent, not until
/// the stream ends.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use review_server::middleware::{timing_layer, SlowRequestThreshold};
///
/// let app = Router::new()
///     .route("/api/example", get(handler))
///     .layer(middleware::from_fn_with_state(SlowRequestThreshold::default(), timing_layer));
/// ```
pub async fn timing_layer(
    State(threshold): State<SlowRequestThreshold>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();

    if elapsed > threshold.0 {
        tracing::warn!(
            method = %method,
            path = %path,
            status,
            duration_ms = elapsed.as_millis(),
            "Slow request"
        );
    } else {
        tracing::debug!(
            method = %method,
            path = %path,
            status,
            duration_ms = elapsed.as_millis(),
            "Request completed"
        );
    }

    response
}
