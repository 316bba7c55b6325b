//! Merging of progress reports into a ranked evaluation.

use std::collections::BTreeMap;

use tracing::trace;
use uci::EngineInfo;

use crate::config::MAX_LINES;
use crate::{EngineLine, Evaluation, Score};

/// Reported by the engine when the side to move has no legal move.
pub const NO_MOVE: &str = "(none)";

/// Accumulates `info` lines for one search.
///
/// Each multi-PV rank keeps only its latest report. Rank 1 additionally
/// drives the top-level depth, score and principal variation.
#[derive(Debug, Clone)]
pub struct SearchAggregator {
    requested_depth: u32,
    depth: Option<u32>,
    score: Option<Score>,
    pv: Vec<String>,
    lines: BTreeMap<u32, EngineLine>,
    emitted_depth: Option<u32>,
}

impl SearchAggregator {
    pub fn new(requested_depth: u32) -> Self {
        Self {
            requested_depth,
            depth: None,
            score: None,
            pv: Vec::new(),
            lines: BTreeMap::new(),
            emitted_depth: None,
        }
    }

    /// Fold one progress line into the running state.
    pub fn apply(&mut self, info: &EngineInfo) {
        if !info.is_line_report() {
            return;
        }
        if info.bound.is_some() {
            trace!(depth = ?info.depth, "skipping bound score");
            return;
        }

        let rank = info.multipv.unwrap_or(1);
        let score = info.score.map(Score::from);

        let previous = self.lines.get(&rank);
        let line_score = score.or_else(|| previous.and_then(|line| line.score));
        let line_pv = if info.pv.is_empty() {
            previous.map(|line| line.pv.clone()).unwrap_or_default()
        } else {
            info.pv.clone()
        };
        let mv = line_pv.first().cloned().unwrap_or_default();

        self.lines.insert(
            rank,
            EngineLine {
                mv,
                score: line_score,
                pv: line_pv.clone(),
            },
        );

        if rank == 1 {
            if let Some(depth) = info.depth {
                self.depth = Some(self.depth.map_or(depth, |d| d.max(depth)));
            }
            if score.is_some() {
                self.score = score;
            }
            self.pv = line_pv;
        }
    }

    /// Depth of the primary line, or the requested depth if none was reported.
    pub fn depth(&self) -> u32 {
        self.depth.unwrap_or(self.requested_depth)
    }

    /// Snapshot of the primary line if it reached a new depth since the last
    /// call. Lines without a reported depth never produce a snapshot.
    pub fn take_progress(&mut self) -> Option<Evaluation> {
        let depth = self.depth?;
        if self.emitted_depth.is_some_and(|emitted| depth <= emitted) {
            return None;
        }
        let primary = self.lines.get(&1)?;
        if primary.pv.is_empty() {
            return None;
        }
        self.emitted_depth = Some(depth);

        Some(Evaluation {
            best_move: primary.mv.clone(),
            score: self.score,
            depth,
            pv: self.pv.clone(),
            lines: self.ranked_lines(),
        })
    }

    /// Build the final evaluation once the engine reports its best move.
    pub fn finish(self, best_move: &str) -> Evaluation {
        let lines = if best_move == NO_MOVE {
            Vec::new()
        } else if self.lines.is_empty() {
            vec![EngineLine {
                mv: best_move.to_string(),
                score: self.score,
                pv: self.pv.clone(),
            }]
        } else {
            self.ranked_lines()
        };

        Evaluation {
            best_move: best_move.to_string(),
            score: self.score,
            depth: self.depth(),
            pv: self.pv,
            lines,
        }
    }

    fn ranked_lines(&self) -> Vec<EngineLine> {
        self.lines.values().take(MAX_LINES).cloned().collect()
    }
}
