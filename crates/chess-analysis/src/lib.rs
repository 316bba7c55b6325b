//! Chess position analysis with Stockfish integration.
//!
//! This crate drives an external UCI engine (Stockfish by default) and turns
//! its output into structured, White-relative evaluations.
//!
//! # Overview
//!
//! - [`Analyzer`] - Single-shot and streamed evaluation of one position
//! - [`analyze_game`] - Samples the final positions of a PGN game
//! - [`EngineSession`] - One engine process, from handshake to teardown
//! - [`SearchAggregator`] - Merges multi-PV progress lines into an [`Evaluation`]
//! - [`normalize`] - Converts side-to-move scores to White's point of view
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{Analyzer, EngineConfig, Position};
//!
//! let analyzer = Analyzer::new(EngineConfig::default());
//! let evaluation = analyzer.evaluate(Position::STARTPOS, 14).await?;
//! println!("{} ({:?})", evaluation.best_move, evaluation.score);
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod game;
pub mod normalize;
pub mod position;
pub mod session;
pub mod transcript;

pub use aggregate::SearchAggregator;
pub use analyzer::{Analyzer, PositionEvaluator, StreamOutcome};
pub use config::EngineConfig;
pub use error::{AnalysisError, ErrorKind};
pub use evaluation::{EngineLine, Evaluation, Score, ScoreKind, StreamEvent};
pub use game::{analyze_game, GameAnalysis, SampleResult, Summary};
pub use normalize::normalize;
pub use position::{FenError, Position, Side};
pub use session::{EngineProcess, EngineSession, Handshake, SearchRequest};
pub use transcript::{MoveSnapshot, PgnTimeline, TimelineSource, TranscriptError};
