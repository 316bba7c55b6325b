//! Review Server
//!
//! Axum-based web server exposing Stockfish position evaluation, live
//! evaluation streams and sampled game reviews.

use anyhow::Context;
use chess_analysis::Analyzer;
use clap::Parser;
use review_server::config::Args;
use review_server::middleware::SlowRequestThreshold;
use review_server::{app, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    tracing::info!("Engine: {}", args.engine_path);
    tracing::info!(
        "Timeouts: {}ms evaluate, {}ms stream",
        args.timeout_ms,
        args.stream_timeout_ms
    );

    let state = AppState {
        analyzer: Analyzer::new(args.engine_config()),
        slow_request: SlowRequestThreshold(args.slow_request()),
    };

    let addr = args.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}
