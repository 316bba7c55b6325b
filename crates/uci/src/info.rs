//! UCI info line types.

use crate::UciError;
use serde::{Deserialize, Serialize};

/// Score in centipawns or mate distance, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = engine winning, negative = engine losing).
    Mate(i32),
}

/// Marks a score reported from an aspiration window fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBound {
    Upper,
    Lower,
}

/// Search information from engine.
///
/// Progress lines are partial: every field is optional and only the
/// keywords present on the line are filled in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// Multi-PV rank (1 = best line).
    pub multipv: Option<u32>,
    /// Score evaluation.
    pub score: Option<Score>,
    /// Set when the score is only a bound.
    pub bound: Option<ScoreBound>,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    pub time: Option<u64>,
    /// Tablebase hits.
    pub tbhits: Option<u64>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
    /// Current move being searched.
    pub currmove: Option<String>,
    /// Current move number.
    pub currmovenumber: Option<u32>,
    /// Hash table usage (per mille).
    pub hashfull: Option<u32>,
    /// Arbitrary string info.
    pub string: Option<String>,
}

impl EngineInfo {
    /// Create a new empty info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the line reports a candidate line (score or pv) rather than
    /// bookkeeping such as `currmove` or `string`.
    pub fn is_line_report(&self) -> bool {
        self.score.is_some() || !self.pv.is_empty()
    }

    /// Format as UCI info string.
    pub fn to_uci(&self) -> String {
        let mut parts = vec!["info".to_string()];

        if let Some(d) = self.depth {
            parts.push(format!("depth {}", d));
        }
        if let Some(d) = self.seldepth {
            parts.push(format!("seldepth {}", d));
        }
        if let Some(m) = self.multipv {
            parts.push(format!("multipv {}", m));
        }
        if let Some(ref s) = self.score {
            match s {
                Score::Cp(cp) => parts.push(format!("score cp {}", cp)),
                Score::Mate(m) => parts.push(format!("score mate {}", m)),
            }
            match self.bound {
                Some(ScoreBound::Upper) => parts.push("upperbound".to_string()),
                Some(ScoreBound::Lower) => parts.push("lowerbound".to_string()),
                None => {}
            }
        }
        if let Some(n) = self.nodes {
            parts.push(format!("nodes {}", n));
        }
        if let Some(n) = self.nps {
            parts.push(format!("nps {}", n));
        }
        if let Some(t) = self.tbhits {
            parts.push(format!("tbhits {}", t));
        }
        if let Some(t) = self.time {
            parts.push(format!("time {}", t));
        }
        if let Some(ref m) = self.currmove {
            parts.push(format!("currmove {}", m));
        }
        if let Some(n) = self.currmovenumber {
            parts.push(format!("currmovenumber {}", n));
        }
        if let Some(h) = self.hashfull {
            parts.push(format!("hashfull {}", h));
        }
        if !self.pv.is_empty() {
            parts.push(format!("pv {}", self.pv.join(" ")));
        }
        if let Some(ref s) = self.string {
            parts.push(format!("string {}", s));
        }

        parts.join(" ")
    }

    /// Parse UCI info line.
    ///
    /// A known keyword whose value is missing or not a number is an error.
    /// Unknown keywords are skipped.
    pub fn parse(line: &str) -> Result<Self, UciError> {
        let line = line.trim();
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"info") {
            return Err(UciError::ParseError(format!("not an info line: {}", line)));
        }

        let mut info = EngineInfo::new();
        let mut i = 1; // Skip "info"

        while i < parts.len() {
            match parts[i] {
                "depth" => info.depth = Some(number(&parts, &mut i, "depth")?),
                "seldepth" => info.seldepth = Some(number(&parts, &mut i, "seldepth")?),
                "multipv" => info.multipv = Some(number(&parts, &mut i, "multipv")?),
                "nodes" => info.nodes = Some(number(&parts, &mut i, "nodes")?),
                "nps" => info.nps = Some(number(&parts, &mut i, "nps")?),
                "time" => info.time = Some(number(&parts, &mut i, "time")?),
                "tbhits" => info.tbhits = Some(number(&parts, &mut i, "tbhits")?),
                "hashfull" => info.hashfull = Some(number(&parts, &mut i, "hashfull")?),
                "currmovenumber" => {
                    info.currmovenumber = Some(number(&parts, &mut i, "currmovenumber")?)
                }
                "currmove" => {
                    i += 1;
                    let mv = parts
                        .get(i)
                        .ok_or_else(|| missing("currmove"))?;
                    info.currmove = Some(mv.to_string());
                }
                "score" => {
                    i += 1;
                    let kind = *parts.get(i).ok_or_else(|| missing("score"))?;
                    let value: i32 = number(&parts, &mut i, "score")?;
                    info.score = Some(match kind {
                        "cp" => Score::Cp(value),
                        "mate" => Score::Mate(value),
                        other => {
                            return Err(UciError::ParseError(format!(
                                "unknown score type '{}'",
                                other
                            )))
                        }
                    });
                    match parts.get(i + 1) {
                        Some(&"upperbound") => {
                            info.bound = Some(ScoreBound::Upper);
                            i += 1;
                        }
                        Some(&"lowerbound") => {
                            info.bound = Some(ScoreBound::Lower);
                            i += 1;
                        }
                        _ => {}
                    }
                }
                "pv" => {
                    i += 1;
                    // Collect all remaining moves until another keyword or end
                    while i < parts.len() && !is_info_keyword(parts[i]) {
                        info.pv.push(parts[i].to_string());
                        i += 1;
                    }
                    if info.pv.is_empty() {
                        return Err(missing("pv"));
                    }
                    continue; // Don't increment i again
                }
                "string" => {
                    // String consumes rest of line
                    info.string = Some(parts[i + 1..].join(" "));
                    break;
                }
                _ => {}
            }
            i += 1;
        }

        Ok(info)
    }
}

/// Advance past `keyword` and parse its numeric value.
fn number<T: std::str::FromStr>(
    parts: &[&str],
    i: &mut usize,
    keyword: &str,
) -> Result<T, UciError> {
    *i += 1;
    let raw = parts.get(*i).ok_or_else(|| missing(keyword))?;
    raw.parse().map_err(|_| {
        UciError::ParseError(format!("invalid value '{}' for '{}'", raw, keyword))
    })
}

fn missing(keyword: &str) -> UciError {
    UciError::ParseError(format!("missing value for '{}'", keyword))
}

fn is_info_keyword(s: &str) -> bool {
    matches!(
        s,
        "depth"
            | "seldepth"
            | "multipv"
            | "score"
            | "nodes"
            | "nps"
            | "time"
            | "tbhits"
            | "pv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "string"
    )
}

/// Builder for constructing EngineInfo.
#[derive(Default)]
pub struct InfoBuilder {
    info: EngineInfo,
}

impl InfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, d: u32) -> Self {
        self.info.depth = Some(d);
        self
    }

    pub fn multipv(mut self, rank: u32) -> Self {
        self.info.multipv = Some(rank);
        self
    }

    pub fn score_cp(mut self, cp: i32) -> Self {
        self.info.score = Some(Score::Cp(cp));
        self
    }

    pub fn score_mate(mut self, moves: i32) -> Self {
        self.info.score = Some(Score::Mate(moves));
        self
    }

    pub fn bound(mut self, bound: ScoreBound) -> Self {
        self.info.bound = Some(bound);
        self
    }

    pub fn nodes(mut self, n: u64) -> Self {
        self.info.nodes = Some(n);
        self
    }

    pub fn pv<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.info.pv = moves.into_iter().map(Into::into).collect();
        self
    }

    pub fn currmove(mut self, mv: &str) -> Self {
        self.info.currmove = Some(mv.to_string());
        self
    }

    pub fn string(mut self, s: &str) -> Self {
        self.info.string = Some(s.to_string());
        self
    }

    pub fn build(self) -> EngineInfo {
        self.info
    }
}
