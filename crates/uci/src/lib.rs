//! UCI (Universal Chess Interface) protocol library.
//!
//! This crate provides the GUI side of the UCI protocol: formatting the
//! commands sent to an engine and tokenizing the lines it writes back.
//!
//! # Commands sent to the engine
//!
//! - `uci` / `uciok` - Identify, wait for acknowledgement
//! - `isready` / `readyok` - Synchronization
//! - `setoption name <name> [value <value>]` - Configure (e.g. `MultiPV`)
//! - `position fen <fen>` - Set position
//! - `go depth <d>` - Start search
//! - `quit`
//!
//! # Lines read from the engine
//!
//! [`EngineMessage::parse`] turns every output line into a typed record.
//! Progress lines become an [`EngineInfo`] partial update; the terminal
//! line becomes [`EngineMessage::BestMove`].

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::{EngineInfo, InfoBuilder, Score, ScoreBound};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UciError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found. `(none)` is reported verbatim when no legal move exists.
    BestMove { mv: String, ponder: Option<String> },
    /// Anything else (`option ...`, banners, blank lines).
    Other(String),
}

impl EngineMessage {
    /// Parse one line of engine output.
    ///
    /// Lines that are not part of the search protocol are returned as
    /// [`EngineMessage::Other`]; malformed protocol lines are errors.
    pub fn parse(line: &str) -> Result<Self, UciError> {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("uciok") => Ok(EngineMessage::UciOk),
            Some("readyok") => Ok(EngineMessage::ReadyOk),
            Some("info") => EngineInfo::parse(line).map(EngineMessage::Info),
            Some("bestmove") => {
                let mv = parts
                    .next()
                    .ok_or_else(|| UciError::ParseError("bestmove without a move".to_string()))?
                    .to_string();
                let ponder = match parts.next() {
                    Some("ponder") => parts.next().map(str::to_string),
                    _ => None,
                };
                Ok(EngineMessage::BestMove { mv, ponder })
            }
            Some("id") => {
                let rest: Vec<&str> = parts.collect();
                match rest.split_first() {
                    Some((&"name", value)) => Ok(EngineMessage::Id {
                        name: Some(value.join(" ")),
                        author: None,
                    }),
                    Some((&"author", value)) => Ok(EngineMessage::Id {
                        name: None,
                        author: Some(value.join(" ")),
                    }),
                    _ => Err(UciError::ParseError(format!("malformed id line: {}", line))),
                }
            }
            _ => Ok(EngineMessage::Other(line.to_string())),
        }
    }

    /// Format message as the engine would write it.
    pub fn to_uci(&self) -> String {
        match self {
            EngineMessage::Id { name, author } => {
                let mut parts = Vec::new();
                if let Some(n) = name {
                    parts.push(format!("id name {}", n));
                }
                if let Some(a) = author {
                    parts.push(format!("id author {}", a));
                }
                parts.join("\n")
            }
            EngineMessage::UciOk => "uciok".to_string(),
            EngineMessage::ReadyOk => "readyok".to_string(),
            EngineMessage::Info(info) => info.to_uci(),
            EngineMessage::BestMove { mv, ponder } => match ponder {
                Some(p) => format!("bestmove {} ponder {}", mv, p),
                None => format!("bestmove {}", mv),
            },
            EngineMessage::Other(line) => line.clone(),
        }
    }
}
