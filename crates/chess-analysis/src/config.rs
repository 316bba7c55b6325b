//! Engine configuration and request bounds.

use std::time::Duration;

/// Default engine command, resolved on `PATH`.
pub const DEFAULT_ENGINE_PATH: &str = "stockfish";

/// Default per-evaluation timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default timeout for streamed evaluations in milliseconds.
pub const DEFAULT_STREAM_TIMEOUT_MS: u64 = 60_000;

/// Number of candidate lines requested from the engine.
pub const MULTI_PV: u32 = 3;

/// Maximum number of lines kept in an [`Evaluation`](crate::Evaluation).
pub const MAX_LINES: usize = 3;

/// Inclusive bounds with a default for an integer request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl Bounds {
    /// Clamp a requested value; a missing value takes the default.
    ///
    /// Out-of-range values are clamped, never rejected.
    pub fn clamp(&self, requested: Option<i64>) -> u32 {
        match requested {
            Some(value) => value.clamp(self.min as i64, self.max as i64) as u32,
            None => self.default,
        }
    }
}

/// Search depth for single evaluations and game samples.
pub const EVALUATE_DEPTH: Bounds = Bounds {
    min: 8,
    max: 25,
    default: 14,
};

/// Search depth for streamed evaluations.
pub const STREAM_DEPTH: Bounds = Bounds {
    min: 8,
    max: 24,
    default: 14,
};

/// Number of trailing positions sampled by game analysis.
pub const SAMPLE_COUNT: Bounds = Bounds {
    min: 1,
    max: 10,
    default: 5,
};

/// How to launch the engine and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Executable path or bare command name.
    pub engine_path: String,
    /// Deadline for a single evaluation, handshake included.
    pub timeout: Duration,
    /// Deadline for a streamed evaluation.
    pub stream_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_path: DEFAULT_ENGINE_PATH.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            stream_timeout: Duration::from_millis(DEFAULT_STREAM_TIMEOUT_MS),
        }
    }
}

impl EngineConfig {
    pub fn with_engine_path(mut self, path: impl Into<String>) -> Self {
        self.engine_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }
}
