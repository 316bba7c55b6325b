//! Chess position evaluation types.

use serde::{Deserialize, Serialize};

/// Score encoding reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    /// Material-equivalent advantage in hundredths of a pawn.
    Cp,
    /// Forced mate in N moves.
    Mate,
}

/// A signed score.
///
/// Straight from the engine the sign is relative to the side to move;
/// after [`normalize`](crate::normalize::normalize) positive favors White.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    #[serde(rename = "type")]
    pub kind: ScoreKind,
    pub value: i32,
}

impl Score {
    pub fn cp(value: i32) -> Self {
        Self {
            kind: ScoreKind::Cp,
            value,
        }
    }

    pub fn mate(value: i32) -> Self {
        Self {
            kind: ScoreKind::Mate,
            value,
        }
    }

    /// Same kind, value multiplied by `sign`, saturating at the `i32` bounds.
    pub fn signed(self, sign: i32) -> Self {
        Self {
            kind: self.kind,
            value: self.value.saturating_mul(sign),
        }
    }
}

impl From<uci::Score> for Score {
    fn from(score: uci::Score) -> Self {
        match score {
            uci::Score::Cp(cp) => Score::cp(cp),
            uci::Score::Mate(m) => Score::mate(m),
        }
    }
}

/// One candidate continuation, ranked by the engine's multi-PV index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLine {
    /// First move of the line in UCI notation.
    #[serde(rename = "move")]
    pub mv: String,
    pub score: Option<Score>,
    pub pv: Vec<String>,
}

/// The engine's verdict on one position.
///
/// `lines[0]`, when present, carries the same move, score and principal
/// variation as the top-level fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Best move in UCI notation (`(none)` when the side to move has no legal move).
    pub best_move: String,
    pub score: Option<Score>,
    /// Search depth reached.
    pub depth: u32,
    /// Principal variation of the best line.
    pub pv: Vec<String>,
    /// Up to three candidate lines, best first.
    pub lines: Vec<EngineLine>,
}

impl Evaluation {
    /// Apply `sign` to every score in the evaluation.
    pub fn signed(mut self, sign: i32) -> Self {
        self.score = self.score.map(|s| s.signed(sign));
        for line in &mut self.lines {
            line.score = line.score.map(|s| s.signed(sign));
        }
        self
    }
}

/// One message on a live evaluation stream.
///
/// Serialized as `{"evaluation": …}`, `{"error": "…"}` or `{"done": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Evaluation { evaluation: Evaluation },
    Error { error: String },
    Done { done: bool },
}

impl StreamEvent {
    pub fn done() -> Self {
        StreamEvent::Done { done: true }
    }

    /// Whether no further event may follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error { .. } | StreamEvent::Done { .. })
    }
}
