//! Command-line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chess_analysis::config::{DEFAULT_ENGINE_PATH, DEFAULT_STREAM_TIMEOUT_MS, DEFAULT_TIMEOUT_MS};
use chess_analysis::EngineConfig;
use clap::Parser;

/// Review Server - Stockfish-backed position and game review over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "review-server")]
#[command(about = "Serves position evaluations, live evaluation streams and game reviews")]
pub struct Args {
    /// Stockfish executable path or command name
    #[arg(long, env = "STOCKFISH_PATH", default_value = DEFAULT_ENGINE_PATH)]
    pub engine_path: String,

    /// Timeout for a single evaluation in milliseconds
    #[arg(long, env = "STOCKFISH_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Timeout for a streamed evaluation in milliseconds
    #[arg(long, env = "STOCKFISH_STREAM_TIMEOUT_MS", default_value_t = DEFAULT_STREAM_TIMEOUT_MS)]
    pub stream_timeout_ms: u64,

    /// Address to listen on
    #[arg(long, env = "REVIEW_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "REVIEW_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Requests slower than this are logged as warnings (milliseconds)
    #[arg(long, env = "REVIEW_SLOW_REQUEST_MS", default_value_t = 100)]
    pub slow_request_ms: u64,
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_engine_path(self.engine_path.clone())
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_stream_timeout(Duration::from_millis(self.stream_timeout_ms))
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn slow_request(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }
}
