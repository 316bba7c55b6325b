//! Review API endpoints.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chess_analysis::config::{EVALUATE_DEPTH, STREAM_DEPTH};
use chess_analysis::{analyze_game, AnalysisError, Evaluation, GameAnalysis, PgnTimeline, Position};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};

use super::ApiError;
use crate::AppState;

/// Buffered stream events per connection.
const STREAM_BUFFER: usize = 32;

/// Body of `POST /api/review/evaluate`.
///
/// Fields are loosely typed: a non-numeric depth falls back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub fen: Option<Value>,
    #[serde(default)]
    pub depth: Option<Value>,
}

/// Body of `POST /api/review/analyze`.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub pgn: Option<Value>,
    #[serde(default)]
    pub depth: Option<Value>,
    #[serde(default)]
    pub samples: Option<Value>,
}

/// Query of `GET /api/review/stream`.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub fen: Option<String>,
    pub depth: Option<i64>,
}

/// A non-empty string, or `None`.
fn required_text(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// A JSON number truncated to an integer, or `None`.
fn number(value: &Option<Value>) -> Option<i64> {
    let value = value.as_ref()?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// POST /api/review/evaluate
///
/// Evaluates one position at a clamped depth (8-25, default 14).
///
/// # Errors
/// * 400 Bad Request - Missing or malformed FEN
/// * 500 Internal Server Error - Engine missing, timed out or failed
pub async fn evaluate(
    State(state): State<AppState>,
    body: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<Evaluation>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let fen = required_text(request.fen)
        .ok_or_else(|| ApiError::BadRequest("fen is required".to_string()))?;
    let depth = EVALUATE_DEPTH.clamp(number(&request.depth));

    let evaluation = state.analyzer.evaluate(fen.trim(), depth).await?;
    Ok(Json(evaluation))
}

/// POST /api/review/analyze
///
/// Replays a PGN game and evaluates its final positions.
///
/// # Errors
/// * 400 Bad Request - Missing or unreadable PGN
///
/// Engine failures are reported on the failed sample, not as an HTTP error.
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<GameAnalysis>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let pgn = required_text(request.pgn)
        .ok_or_else(|| ApiError::BadRequest("pgn is required".to_string()))?;

    let analysis = analyze_game(
        &PgnTimeline,
        &state.analyzer,
        &pgn,
        number(&request.samples),
        number(&request.depth),
    )
    .await?;
    Ok(Json(analysis))
}

/// GET /api/review/stream?fen=...&depth=14
///
/// Server-sent events: deeper partial evaluations, the final evaluation,
/// then `{"done":true}`; or a single `{"error":"..."}`. Closing the
/// connection stops the engine.
///
/// # Errors
/// * 400 Bad Request - Missing or malformed FEN (before the stream opens)
pub async fn stream(
    State(state): State<AppState>,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let fen = query
        .fen
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::BadRequest("fen is required".to_string()))?;
    Position::parse(&fen).map_err(AnalysisError::from)?;
    let depth = STREAM_DEPTH.clamp(query.depth);

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let analyzer = state.analyzer.clone();
    tokio::spawn(async move {
        let outcome = analyzer.stream(&fen, depth, tx).await;
        tracing::debug!(?outcome, depth, "evaluation stream finished");
    });

    let events = ReceiverStream::new(rx).map(|event| Event::default().json_data(event));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text(Some(json!("1. e4"))), Some("1. e4".to_string()));
        assert_eq!(required_text(Some(json!("   "))), None);
        assert_eq!(required_text(Some(json!(42))), None);
        assert_eq!(required_text(None), None);
    }

    #[test]
    fn test_number() {
        assert_eq!(number(&Some(json!(18))), Some(18));
        assert_eq!(number(&Some(json!(12.7))), Some(12));
        assert_eq!(number(&Some(json!(-3))), Some(-3));
        assert_eq!(number(&Some(json!("18"))), None);
        assert_eq!(number(&None), None);
    }

    #[test]
    fn test_request_deserialize() {
        let body: AnalyzeRequest =
            serde_json::from_str(r#"{"pgn": "1. e4 e5", "samples": 3}"#).unwrap();
        assert_eq!(number(&body.samples), Some(3));
        assert!(body.depth.is_none());

        let empty: EvaluateRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.fen.is_none());
    }
}
