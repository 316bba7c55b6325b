//! FEN (Forsyth-Edwards Notation) validation for positions handed to the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::AnalysisError;

/// Errors that can occur when parsing FEN strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("invalid FEN: expected 4 to 6 parts, got {0}")]
    InvalidPartCount(usize),

    #[error("invalid piece placement: {0}")]
    InvalidPiecePlacement(String),

    #[error("invalid active color: expected 'w' or 'b', got '{0}'")]
    InvalidActiveColor(String),

    #[error("invalid castling rights: {0}")]
    InvalidCastlingRights(String),

    #[error("invalid en passant square: {0}")]
    InvalidEnPassantSquare(String),

    #[error("invalid halfmove clock: {0}")]
    InvalidHalfmoveClock(String),

    #[error("invalid fullmove number: {0}")]
    InvalidFullmoveNumber(String),

    #[error("illegal position: {0}")]
    IllegalPosition(String),
}

impl From<FenError> for AnalysisError {
    fn from(err: FenError) -> Self {
        AnalysisError::InvalidInput(err.to_string())
    }
}

/// The side to move (or the side that made a move).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// `+1` for White, `-1` for Black.
    pub fn sign(self) -> i32 {
        match self {
            Side::White => 1,
            Side::Black => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<chess::Color> for Side {
    fn from(color: chess::Color) -> Self {
        match color {
            chess::Color::White => Side::White,
            chess::Color::Black => Side::Black,
        }
    }
}

/// A valid, legal position.
///
/// Fields are checked one by one first so errors name the broken part;
/// the `chess` crate then rejects positions that cannot arise in a game
/// (side not to move in check, touching kings, impossible castling rights),
/// which the engine would otherwise crash on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Piece placement (e.g., "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR")
    pub placement: String,
    /// Side to move.
    pub side_to_move: Side,
    /// Castling availability (e.g., "KQkq", "-")
    pub castling: String,
    /// En passant target square (e.g., "e3", "-")
    pub en_passant: String,
    /// Halfmove clock (for 50-move rule)
    pub halfmove_clock: u32,
    /// Fullmove number
    pub fullmove_number: u32,
}

impl Position {
    /// The standard starting position FEN.
    pub const STARTPOS: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Parses a FEN string. The two move clocks may be omitted.
    pub fn parse(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if !(4..=6).contains(&parts.len()) {
            return Err(FenError::InvalidPartCount(parts.len()));
        }

        let placement = parts[0];
        Self::validate_piece_placement(placement)?;

        let side_to_move = Self::parse_side(parts[1])
            .ok_or_else(|| FenError::InvalidActiveColor(parts[1].to_string()))?;

        let castling = parts[2];
        Self::validate_castling(castling)?;

        let en_passant = parts[3];
        Self::validate_en_passant(en_passant)?;

        let halfmove_clock = match parts.get(4) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| FenError::InvalidHalfmoveClock(raw.to_string()))?,
            None => 0,
        };

        let fullmove_number = match parts.get(5) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| FenError::InvalidFullmoveNumber(raw.to_string()))?,
            None => 1,
        };

        let position = Position {
            placement: placement.to_string(),
            side_to_move,
            castling: castling.to_string(),
            en_passant: en_passant.to_string(),
            halfmove_clock,
            fullmove_number,
        };
        chess::Board::from_str(&position.to_fen())
            .map_err(|e| FenError::IllegalPosition(e.to_string()))?;
        Ok(position)
    }

    /// Reads only the side-to-move field, without validating the rest.
    pub fn side_of(fen: &str) -> Option<Side> {
        fen.split_whitespace().nth(1).and_then(Self::parse_side)
    }

    fn parse_side(field: &str) -> Option<Side> {
        match field {
            "w" => Some(Side::White),
            "b" => Some(Side::Black),
            _ => None,
        }
    }

    fn validate_piece_placement(placement: &str) -> Result<(), FenError> {
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::InvalidPiecePlacement(format!(
                "expected 8 ranks, got {}",
                ranks.len()
            )));
        }

        for (i, rank) in ranks.iter().enumerate() {
            let mut squares = 0;
            for c in rank.chars() {
                if let Some(run) = c.to_digit(10) {
                    squares += run;
                } else if "pnbrqkPNBRQK".contains(c) {
                    squares += 1;
                } else {
                    return Err(FenError::InvalidPiecePlacement(format!(
                        "invalid character '{}' in rank {}",
                        c,
                        8 - i
                    )));
                }
            }
            if squares != 8 {
                return Err(FenError::InvalidPiecePlacement(format!(
                    "rank {} has {} squares, expected 8",
                    8 - i,
                    squares
                )));
            }
        }

        let kings = |king: char| placement.chars().filter(|&c| c == king).count();
        if kings('K') != 1 || kings('k') != 1 {
            return Err(FenError::InvalidPiecePlacement(
                "each side needs exactly one king".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_castling(castling: &str) -> Result<(), FenError> {
        if castling == "-" {
            return Ok(());
        }

        for c in castling.chars() {
            if !"KQkq".contains(c) {
                return Err(FenError::InvalidCastlingRights(format!(
                    "invalid character '{}'",
                    c
                )));
            }
        }

        Ok(())
    }

    fn validate_en_passant(ep: &str) -> Result<(), FenError> {
        if ep == "-" {
            return Ok(());
        }

        let chars: Vec<char> = ep.chars().collect();
        if chars.len() != 2
            || !('a'..='h').contains(&chars[0])
            || !(chars[1] == '3' || chars[1] == '6')
        {
            return Err(FenError::InvalidEnPassantSquare(ep.to_string()));
        }

        Ok(())
    }

    /// Canonical single-spaced FEN with both clocks.
    pub fn to_fen(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.placement,
            match self.side_to_move {
                Side::White => 'w',
                Side::Black => 'b',
            },
            self.castling,
            self.en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_startpos() {
        let pos = Position::parse(Position::STARTPOS).unwrap();
        assert_eq!(pos.side_to_move, Side::White);
        assert_eq!(pos.castling, "KQkq");
        assert_eq!(pos.en_passant, "-");
        assert_eq!(pos.to_fen(), Position::STARTPOS);
    }

    #[test]
    fn parse_black_to_move_with_en_passant() {
        let pos =
            Position::parse("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
        assert_eq!(pos.side_to_move, Side::Black);
        assert_eq!(pos.en_passant, "e3");
    }

    #[test]
    fn clocks_are_optional() {
        let pos = Position::parse("8/8/8/4k3/8/8/8/4K2R w K -").unwrap();
        assert_eq!(pos.halfmove_clock, 0);
        assert_eq!(pos.fullmove_number, 1);
        assert_eq!(pos.to_fen(), "8/8/8/4k3/8/8/8/4K2R w K - 0 1");
    }

    #[test]
    fn rejects_malformed_strings() {
        assert_eq!(Position::parse(""), Err(FenError::InvalidPartCount(0)));
        assert!(matches!(
            Position::parse("not a fen"),
            Err(FenError::InvalidPartCount(3))
        ));
        assert!(matches!(
            Position::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1"),
            Err(FenError::InvalidPiecePlacement(_))
        ));
        assert!(matches!(
            Position::parse("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(FenError::InvalidPiecePlacement(_))
        ));
        assert!(matches!(
            Position::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
            Err(FenError::InvalidActiveColor(_))
        ));
        assert!(matches!(
            Position::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQxq - 0 1"),
            Err(FenError::InvalidCastlingRights(_))
        ));
        assert!(matches!(
            Position::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e4 0 1"),
            Err(FenError::InvalidEnPassantSquare(_))
        ));
        assert!(matches!(
            Position::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1"),
            Err(FenError::InvalidHalfmoveClock(_))
        ));
    }

    #[test]
    fn rejects_missing_king() {
        assert!(matches!(
            Position::parse("8/8/8/8/8/8/8/4K3 w - - 0 1"),
            Err(FenError::InvalidPiecePlacement(_))
        ));
    }

    #[test]
    fn rejects_illegal_positions() {
        // Black is in check with White to move.
        assert!(matches!(
            Position::parse("4k3/8/8/8/8/8/8/4R1K1 w - - 0 1"),
            Err(FenError::IllegalPosition(_))
        ));
        // Kings on adjacent squares.
        assert!(matches!(
            Position::parse("8/8/8/3kK3/8/8/8/8 w - - 0 1"),
            Err(FenError::IllegalPosition(_))
        ));
        // Castling rights without the rook.
        assert!(matches!(
            Position::parse("4k3/8/8/8/8/8/8/4K3 w K - 0 1"),
            Err(FenError::IllegalPosition(_))
        ));
    }

    #[test]
    fn side_of_is_lenient() {
        assert_eq!(Position::side_of("garbage b"), Some(Side::Black));
        assert_eq!(Position::side_of(Position::STARTPOS), Some(Side::White));
        assert_eq!(Position::side_of("8/8/8/8/8/8/8/8"), None);
        assert_eq!(Position::side_of("8/8/8/8/8/8/8/8 x - -"), None);
    }

    #[test]
    fn fen_error_becomes_invalid_input() {
        let err: AnalysisError = FenError::InvalidPartCount(1).into();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[test]
    fn side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Black).unwrap(), "\"black\"");
        assert_eq!(Side::White.sign(), 1);
        assert_eq!(Side::Black.sign(), -1);
    }
}
