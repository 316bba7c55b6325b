//! Error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_analysis::{AnalysisError, ErrorKind};
use serde_json::json;

/// Failure of an API request, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Request was missing a field or could not be decoded.
    BadRequest(String),
    /// The analysis itself failed.
    Analysis(AnalysisError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Analysis(e) => match e.kind() {
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::EngineNotFound | ErrorKind::TimedOut | ErrorKind::EngineStream => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Analysis(e) => e.client_message(),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError::Analysis(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.message(), "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.message(), "rejected request");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
