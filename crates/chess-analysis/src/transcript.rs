//! Game transcripts (PGN) replayed into a per-ply timeline.
//!
//! The move text is tokenized here; move legality, SAN resolution and FEN
//! production come from the `chess` crate.

use std::str::FromStr;

use chess::{Board, ChessMove, File, MoveGen, Piece, Square};
use serde::Serialize;
use thiserror::Error;

use crate::{AnalysisError, Position, Side};

/// Errors that can occur while reading a transcript.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("transcript contains no moves")]
    Empty,

    #[error("invalid starting position: {0}")]
    InvalidStart(String),

    #[error("unterminated {0} in transcript")]
    Unterminated(&'static str),

    #[error("illegal or unreadable move '{san}' at ply {ply}")]
    IllegalMove { ply: u32, san: String },
}

impl From<TranscriptError> for AnalysisError {
    fn from(err: TranscriptError) -> Self {
        AnalysisError::InvalidInput(format!("Invalid PGN supplied: {}", err))
    }
}

/// The position after one ply of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSnapshot {
    /// 1-based half-move index.
    pub ply: u32,
    /// Full-move number, `ceil(ply / 2)`.
    pub move_number: u32,
    /// Side that played the move.
    pub color: Side,
    /// Move as written in standard algebraic notation.
    pub san: String,
    /// Position after the move.
    pub fen: String,
}

/// Source of a game timeline.
pub trait TimelineSource {
    /// Replay `transcript` from its starting position, one snapshot per ply.
    fn timeline(&self, transcript: &str) -> Result<Vec<MoveSnapshot>, TranscriptError>;
}

/// PGN reader backed by the `chess` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgnTimeline;

impl TimelineSource for PgnTimeline {
    fn timeline(&self, transcript: &str) -> Result<Vec<MoveSnapshot>, TranscriptError> {
        let game = parse_pgn(transcript)?;
        if game.moves.is_empty() {
            return Err(TranscriptError::Empty);
        }

        let start = match &game.start_fen {
            Some(fen) => Position::parse(fen)
                .map_err(|e| TranscriptError::InvalidStart(e.to_string()))?,
            None => Position::parse(Position::STARTPOS)
                .map_err(|e| TranscriptError::InvalidStart(e.to_string()))?,
        };
        let mut board = Board::from_str(&start.to_fen())
            .map_err(|e| TranscriptError::InvalidStart(e.to_string()))?;
        let mut halfmove = start.halfmove_clock;
        let mut fullmove = start.fullmove_number;

        let mut timeline = Vec::with_capacity(game.moves.len());
        for (index, san) in game.moves.iter().enumerate() {
            let ply = index as u32 + 1;
            let mv = resolve_san(&board, san).ok_or_else(|| TranscriptError::IllegalMove {
                ply,
                san: san.clone(),
            })?;

            let mover = board.side_to_move();
            let resets_clock = board.piece_on(mv.get_source()) == Some(Piece::Pawn)
                || board.piece_on(mv.get_dest()).is_some();
            board = board.make_move_new(mv);

            halfmove = if resets_clock { 0 } else { halfmove + 1 };
            if mover == chess::Color::Black {
                fullmove += 1;
            }

            timeline.push(MoveSnapshot {
                ply,
                move_number: (ply + 1) / 2,
                color: mover.into(),
                san: san.clone(),
                fen: with_clocks(&board, halfmove, fullmove),
            });
        }

        Ok(timeline)
    }
}

/// Header fields and mainline moves of one game.
#[derive(Debug, Default, PartialEq, Eq)]
struct PgnGame {
    start_fen: Option<String>,
    moves: Vec<String>,
}

fn parse_pgn(text: &str) -> Result<PgnGame, TranscriptError> {
    let mut game = PgnGame::default();
    let mut movetext = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            if let Some((key, value)) = parse_tag(trimmed) {
                if key.eq_ignore_ascii_case("FEN") {
                    game.start_fen = Some(value.to_string());
                }
            }
            continue;
        }
        if trimmed.starts_with('%') {
            continue;
        }
        movetext.push_str(line);
        movetext.push('\n');
    }

    for token in strip_annotations(&movetext)?.split_whitespace() {
        if let Some(san) = move_token(token) {
            game.moves.push(san);
        }
    }

    Ok(game)
}

/// `[Key "Value"]` pairs.
fn parse_tag(line: &str) -> Option<(&str, &str)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let (key, rest) = inner.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((key, value))
}

/// Drop comments and variations, keeping only the mainline.
fn strip_annotations(movetext: &str) -> Result<String, TranscriptError> {
    let mut out = String::with_capacity(movetext.len());
    let mut chars = movetext.chars();
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if !chars.by_ref().any(|c| c == '}') {
                    return Err(TranscriptError::Unterminated("comment"));
                }
                out.push(' ');
            }
            ';' => {
                chars.by_ref().find(|&c| c == '\n');
                out.push(' ');
            }
            '(' => {
                depth += 1;
                out.push(' ');
            }
            ')' if depth > 0 => {
                depth -= 1;
                out.push(' ');
            }
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }

    if depth > 0 {
        return Err(TranscriptError::Unterminated("variation"));
    }
    Ok(out)
}

/// Reduce a movetext token to a bare SAN move, or `None` for move numbers,
/// NAGs and results.
fn move_token(token: &str) -> Option<String> {
    if token.starts_with('$') || matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*") {
        return None;
    }

    let body = if token.starts_with("0-0") {
        token
    } else if token.starts_with(|c: char| c.is_ascii_digit()) {
        // "12." / "12..." / "12.e4"
        let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
        if !rest.starts_with('.') {
            return None;
        }
        rest.trim_start_matches('.')
    } else {
        token
    };

    let san = body
        .trim_end_matches(|c: char| matches!(c, '+' | '#' | '!' | '?'))
        .trim_end_matches("e.p.");
    if san.is_empty() {
        return None;
    }
    // SAN never contains a zero outside of castling.
    Some(san.replace('0', "O"))
}

/// Find the legal move that `san` describes.
fn resolve_san(board: &Board, san: &str) -> Option<ChessMove> {
    let rank = board.side_to_move().to_my_backrank();
    let castle = |file: File| {
        let from = Square::make_square(rank, File::E);
        let to = Square::make_square(rank, file);
        MoveGen::new_legal(board).find(|m| {
            m.get_source() == from
                && m.get_dest() == to
                && board.piece_on(from) == Some(Piece::King)
        })
    };
    match san {
        "O-O" => return castle(File::G),
        "O-O-O" => return castle(File::C),
        _ => {}
    }

    let (body, promotion) = match san.split_once('=') {
        Some((body, promo)) => (body, Some(piece_from_letter(promo.chars().next()?)?)),
        None => match san.char_indices().last() {
            // Promotion without '=' (e.g. "e8Q")
            Some((idx, c)) if c.is_ascii_uppercase() && idx > 0 => {
                (&san[..idx], Some(piece_from_letter(c)?))
            }
            _ => (san, None),
        },
    };

    let mut chars: Vec<char> = body.chars().filter(|&c| c != 'x' && c != '-').collect();
    let piece = match chars.first() {
        Some(&c) if c.is_ascii_uppercase() => {
            chars.remove(0);
            piece_from_letter(c)?
        }
        _ => Piece::Pawn,
    };
    if chars.len() < 2 {
        return None;
    }

    let dest: String = chars[chars.len() - 2..].iter().collect();
    let dest = Square::from_str(&dest).ok()?;
    let hints = &chars[..chars.len() - 2];
    let hint_file = hints.iter().find(|c| c.is_ascii_lowercase());
    let hint_rank = hints.iter().find(|c| c.is_ascii_digit());

    let mut candidates = MoveGen::new_legal(board).filter(|m| {
        let source = m.get_source();
        m.get_dest() == dest
            && board.piece_on(source) == Some(piece)
            && m.get_promotion() == promotion
            && hint_file.map_or(true, |&f| square_file(source) == f)
            && hint_rank.map_or(true, |&r| square_rank(source) == r)
    });

    let found = candidates.next()?;
    // Ambiguous without disambiguation
    if candidates.next().is_some() {
        return None;
    }
    Some(found)
}

fn piece_from_letter(c: char) -> Option<Piece> {
    match c.to_ascii_uppercase() {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        'K' => Some(Piece::King),
        'P' => Some(Piece::Pawn),
        _ => None,
    }
}

fn square_file(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn square_rank(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

/// The board's FEN with our own move clocks, which `chess::Board` does not track.
///
/// The en passant field is rebuilt too: the board reports the square of the
/// pawn that just moved, FEN wants the square it skipped.
fn with_clocks(board: &Board, halfmove: u32, fullmove: u32) -> String {
    let fen = board.to_string();
    let fields: Vec<&str> = fen.split_whitespace().take(3).collect();
    let en_passant = board
        .en_passant()
        .and_then(|pawn| pawn.forward(board.side_to_move()))
        .map(|target| target.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{} {} {} {}", fields.join(" "), en_passant, halfmove, fullmove)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(pgn: &str) -> Result<Vec<MoveSnapshot>, TranscriptError> {
        PgnTimeline.timeline(pgn)
    }

    #[test]
    fn test_simple_game() {
        let moves = timeline("1. e4 e5 2. Nf3 Nc6 3. Bb5").unwrap();
        assert_eq!(moves.len(), 5);

        assert_eq!(moves[0].ply, 1);
        assert_eq!(moves[0].move_number, 1);
        assert_eq!(moves[0].color, Side::White);
        assert_eq!(moves[0].san, "e4");
        assert!(moves[0].fen.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq"));
        assert!(moves[0].fen.ends_with(" 0 1"));

        assert_eq!(moves[1].color, Side::Black);
        assert_eq!(moves[1].move_number, 1);
        assert!(moves[1].fen.ends_with(" 0 2"));

        assert_eq!(moves[4].ply, 5);
        assert_eq!(moves[4].move_number, 3);
        assert_eq!(moves[4].san, "Bb5");
        assert_eq!(
            moves[4].fen,
            "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3"
        );
    }

    #[test]
    fn test_en_passant_target_square() {
        let moves = timeline("1. e4 d5 2. e5 f5 3. exf6").unwrap();
        assert_eq!(
            moves[3].fen,
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3"
        );
        assert_eq!(
            moves[4].fen,
            "rnbqkbnr/ppp1p1pp/5P2/3p4/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3"
        );
        for snapshot in &moves {
            assert!(
                Position::parse(&snapshot.fen).is_ok(),
                "unreadable FEN {}",
                snapshot.fen
            );
        }
    }

    #[test]
    fn test_en_passant_for_black() {
        let pgn = r#"[FEN "4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1"]

1. e4 dxe3"#;
        let moves = timeline(pgn).unwrap();
        assert_eq!(moves[0].fen, "4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1");
        assert_eq!(moves[1].fen, "4k3/8/8/8/8/4p3/8/4K3 w - - 0 2");
    }

    #[test]
    fn test_tags_comments_variations_and_nags() {
        let pgn = r#"[Event "Casual"]
[White "A"]
[Black "B"]
[Result "1-0"]

1. e4 {best by test} e5 (1... c5 2. Nf3 (2. c3) d6) 2. Nf3 $1 Nc6 ; a comment
3. Bc4!? Nf6?! 1-0"#;
        let moves = timeline(pgn).unwrap();
        let sans: Vec<&str> = moves.iter().map(|m| m.san.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6", "Bc4", "Nf6"]);
    }

    #[test]
    fn test_black_move_numbers_and_check_marks() {
        let pgn = "1.f3 e5 2.g4 Qh4#";
        let moves = timeline(pgn).unwrap();
        assert_eq!(moves.len(), 4);
        assert_eq!(moves[3].san, "Qh4");
        assert_eq!(moves[3].color, Side::Black);
        assert_eq!(moves[3].move_number, 2);
    }

    #[test]
    fn test_castling_spellings() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. 0-0 Nf6 5. d3 O-O";
        let moves = timeline(pgn).unwrap();
        assert_eq!(moves[6].san, "O-O");
        assert_eq!(
            moves[6].fen,
            "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 b kq - 5 4"
        );
        assert_eq!(moves[9].san, "O-O");
        assert!(moves[9].fen.starts_with("r1bq1rk1/"));
    }

    #[test]
    fn test_disambiguation_and_promotion() {
        // Two knights can reach d2; the file hint picks one.
        let pgn = r#"[FEN "4k3/P7/8/8/8/8/8/1N2K1N1 w - - 0 1"]

1. Nf3 Kd7 2. Nbd2 Kc7 3. a8=Q"#;
        let moves = timeline(pgn).unwrap();
        assert_eq!(moves.len(), 5);
        assert_eq!(moves[2].fen, "8/P2k4/8/8/8/5N2/3N4/4K3 b - - 3 2");
        assert!(moves[4].fen.starts_with("Q7/"));
    }

    #[test]
    fn test_custom_start_position() {
        let pgn = r#"[SetUp "1"]
[FEN "4k3/8/8/8/8/8/4P3/4K3 b - - 4 30"]

30... Kd7 31. e4"#;
        let moves = timeline(pgn).unwrap();
        assert_eq!(moves[0].color, Side::Black);
        assert_eq!(moves[0].fen, "8/3k4/8/8/8/8/4P3/4K3 w - - 5 31");
        assert!(moves[1].fen.ends_with(" 0 31"));
    }

    #[test]
    fn test_empty_transcript() {
        assert_eq!(timeline(""), Err(TranscriptError::Empty));
        assert_eq!(
            timeline("[Event \"Nothing\"]\n\n*"),
            Err(TranscriptError::Empty)
        );
    }

    #[test]
    fn test_illegal_move() {
        assert_eq!(
            timeline("1. e4 e5 2. Ke3"),
            Err(TranscriptError::IllegalMove {
                ply: 3,
                san: "Ke3".to_string()
            })
        );
        assert!(matches!(
            timeline("this is not chess"),
            Err(TranscriptError::IllegalMove { ply: 1, .. })
        ));
    }

    #[test]
    fn test_unterminated_comment() {
        assert_eq!(
            timeline("1. e4 { never closed"),
            Err(TranscriptError::Unterminated("comment"))
        );
        assert_eq!(
            timeline("1. e4 (1. d4"),
            Err(TranscriptError::Unterminated("variation"))
        );
    }

    #[test]
    fn test_bad_start_fen() {
        assert!(matches!(
            timeline("[FEN \"not a fen\"]\n\n1. e4"),
            Err(TranscriptError::InvalidStart(_))
        ));
    }

    #[test]
    fn test_error_is_invalid_input() {
        let err: AnalysisError = TranscriptError::Empty.into();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
        assert!(err.to_string().starts_with("Invalid PGN supplied"));
    }

    #[test]
    fn test_move_tokens() {
        assert_eq!(move_token("12."), None);
        assert_eq!(move_token("12..."), None);
        assert_eq!(move_token("$14"), None);
        assert_eq!(move_token("1/2-1/2"), None);
        assert_eq!(move_token("12.Nf3").as_deref(), Some("Nf3"));
        assert_eq!(move_token("exd5+").as_deref(), Some("exd5"));
        assert_eq!(move_token("0-0-0").as_deref(), Some("O-O-O"));
        assert_eq!(move_token("O-O#").as_deref(), Some("O-O"));
    }

    #[test]
    fn test_snapshot_wire_names() {
        let moves = timeline("1. d4").unwrap();
        let json = serde_json::to_value(&moves[0]).unwrap();
        assert_eq!(json["ply"], 1);
        assert_eq!(json["moveNumber"], 1);
        assert_eq!(json["color"], "white");
        assert_eq!(json["san"], "d4");
    }
}
