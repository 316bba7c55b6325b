//! Error taxonomy shared by every evaluation mode.

use thiserror::Error;

/// Message shown to clients when the engine executable is missing.
pub const ENGINE_NOT_FOUND_MESSAGE: &str = "Stockfish engine not found on server. Install Stockfish and ensure it's on PATH or set STOCKFISH_PATH.";

/// Errors that can occur while evaluating positions.
///
/// Process and I/O failures are translated into one of these variants at
/// the session boundary; callers never see raw OS errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Malformed position or transcript. Raised before any engine is spawned.
    #[error("{0}")]
    InvalidInput(String),
    /// The engine executable could not be located.
    #[error("Engine not found at path: {0}")]
    EngineNotFound(String),
    /// No acknowledgement or result arrived before the deadline.
    #[error("Stockfish analysis timed out")]
    TimedOut,
    /// The engine exited unexpectedly or wrote unusable data.
    #[error("Engine stream error: {0}")]
    EngineStream(String),
}

/// Stable classification of [`AnalysisError`] for callers that map errors
/// onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    EngineNotFound,
    TimedOut,
    EngineStream,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidInput(_) => ErrorKind::InvalidInput,
            AnalysisError::EngineNotFound(_) => ErrorKind::EngineNotFound,
            AnalysisError::TimedOut => ErrorKind::TimedOut,
            AnalysisError::EngineStream(_) => ErrorKind::EngineStream,
        }
    }

    /// Text suitable for an end user. Only a missing engine differs from `Display`.
    pub fn client_message(&self) -> String {
        match self {
            AnalysisError::EngineNotFound(_) => ENGINE_NOT_FOUND_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Translate a spawn failure, keeping "executable missing" distinct.
    pub(crate) fn from_spawn(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AnalysisError::EngineNotFound(path.to_string()),
            _ => AnalysisError::EngineStream(format!("failed to spawn engine: {}", err)),
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::EngineStream(err.to_string())
    }
}
