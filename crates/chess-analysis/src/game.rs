//! Whole-game analysis by sampling the final positions.

use serde::Serialize;
use tracing::{info, warn};

use crate::analyzer::PositionEvaluator;
use crate::config::{EVALUATE_DEPTH, SAMPLE_COUNT};
use crate::transcript::{MoveSnapshot, TimelineSource};
use crate::{AnalysisError, Evaluation};

/// Counts describing what was analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Number of plies in the game.
    pub total_moves: usize,
    /// Number of samples actually recorded.
    pub sampled: usize,
    /// Number of samples asked for, after clamping.
    pub requested: usize,
    /// Search depth used for every sample.
    pub depth: u32,
}

/// A sampled position and its evaluation.
///
/// A failed sample carries `error` and no evaluation; it is always the last
/// sample of its analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleResult {
    #[serde(flatten)]
    pub snapshot: MoveSnapshot,
    pub evaluation: Option<Evaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of analyzing a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameAnalysis {
    pub summary: Summary,
    pub timeline: Vec<MoveSnapshot>,
    pub samples: Vec<SampleResult>,
}

/// Evaluate the last `samples` positions of a game, one at a time.
///
/// `samples` and `depth` are clamped to their bounds (missing values take
/// the defaults). An unreadable transcript fails before any evaluation. The
/// first failed evaluation is recorded on its sample and ends the run.
pub async fn analyze_game<T, E>(
    source: &T,
    evaluator: &E,
    transcript: &str,
    samples: Option<i64>,
    depth: Option<i64>,
) -> Result<GameAnalysis, AnalysisError>
where
    T: TimelineSource + ?Sized,
    E: PositionEvaluator + ?Sized,
{
    let requested = SAMPLE_COUNT.clamp(samples) as usize;
    let depth = EVALUATE_DEPTH.clamp(depth);

    let timeline = source.timeline(transcript)?;
    let window = requested.min(timeline.len());
    let start = timeline.len() - window;
    info!(
        plies = timeline.len(),
        samples = window,
        depth,
        "analyzing game"
    );

    let mut results = Vec::with_capacity(window);
    for snapshot in &timeline[start..] {
        match evaluator.evaluate(&snapshot.fen, depth).await {
            Ok(evaluation) => results.push(SampleResult {
                snapshot: snapshot.clone(),
                evaluation: Some(evaluation),
                error: None,
            }),
            Err(e) => {
                warn!(ply = snapshot.ply, error = %e, "sample evaluation failed");
                results.push(SampleResult {
                    snapshot: snapshot.clone(),
                    evaluation: None,
                    error: Some(e.client_message()),
                });
                break;
            }
        }
    }

    Ok(GameAnalysis {
        summary: Summary {
            total_moves: timeline.len(),
            sampled: results.len(),
            requested,
            depth,
        },
        timeline,
        samples: results,
    })
}
