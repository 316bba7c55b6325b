//! UCI command formatting and parsing.

use crate::UciError;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Set an engine option.
    SetOption { name: String, value: Option<String> },
    /// Set up position.
    Position { fen: String },
    /// Start calculating.
    Go(GoOptions),
    /// Quit the engine.
    Quit,
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search to this depth.
    pub depth: Option<u32>,
}

impl GoOptions {
    /// Fixed-depth search.
    pub fn depth(depth: u32) -> Self {
        Self { depth: Some(depth) }
    }
}

impl GuiCommand {
    /// `setoption name MultiPV value <n>`.
    pub fn multipv(width: u32) -> Self {
        GuiCommand::SetOption {
            name: "MultiPV".to_string(),
            value: Some(width.to_string()),
        }
    }

    /// `position fen <fen>`.
    pub fn position_fen(fen: &str) -> Self {
        GuiCommand::Position {
            fen: fen.to_string(),
        }
    }

    /// Format the command as the line written to the engine (no newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::SetOption { name, value } => match value {
                Some(v) => format!("setoption name {} value {}", name, v),
                None => format!("setoption name {}", name),
            },
            GuiCommand::Position { fen } => format!("position fen {}", fen),
            GuiCommand::Go(opts) => match opts.depth {
                Some(d) => format!("go depth {}", d),
                None => "go".to_string(),
            },
            GuiCommand::Quit => "quit".to_string(),
        }
    }

    /// Parse a UCI command string.
    pub fn parse(input: &str) -> Result<Self, UciError> {
        let input = input.trim();
        let mut parts = input.split_whitespace();

        match parts.next() {
            Some("uci") => Ok(GuiCommand::Uci),
            Some("isready") => Ok(GuiCommand::IsReady),
            Some("quit") => Ok(GuiCommand::Quit),
            Some("setoption") => Self::parse_setoption(parts),
            Some("position") => Self::parse_position(parts),
            Some("go") => Self::parse_go(parts),
            Some(other) => Err(UciError::InvalidCommand(other.to_string())),
            None => Err(UciError::InvalidCommand("empty line".to_string())),
        }
    }

    fn parse_setoption<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        if parts.next() != Some("name") {
            return Err(UciError::InvalidCommand(
                "setoption requires 'name'".to_string(),
            ));
        }

        let mut name = Vec::new();
        let mut value: Option<Vec<&str>> = None;
        for part in parts {
            if let Some(v) = value.as_mut() {
                v.push(part);
            } else if part == "value" {
                value = Some(Vec::new());
            } else {
                name.push(part);
            }
        }

        if name.is_empty() {
            return Err(UciError::InvalidCommand(
                "setoption without option name".to_string(),
            ));
        }

        Ok(GuiCommand::SetOption {
            name: name.join(" "),
            value: value.map(|v| v.join(" ")),
        })
    }

    fn parse_position<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        if parts.next() != Some("fen") {
            return Err(UciError::ParseError("expected 'fen'".to_string()));
        }
        let fen: Vec<&str> = parts.collect();
        if fen.is_empty() {
            return Err(UciError::ParseError("position without a FEN".to_string()));
        }
        Ok(GuiCommand::Position { fen: fen.join(" ") })
    }

    fn parse_go<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let mut opts = GoOptions::default();
        while let Some(part) = parts.next() {
            if part == "depth" {
                let raw = parts
                    .next()
                    .ok_or_else(|| UciError::ParseError("depth without a value".to_string()))?;
                opts.depth = Some(
                    raw.parse()
                        .map_err(|_| UciError::ParseError(format!("invalid depth '{}'", raw)))?,
                );
            }
        }
        Ok(GuiCommand::Go(opts))
    }
}
