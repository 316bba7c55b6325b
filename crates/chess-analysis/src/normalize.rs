//! Conversion of side-relative scores to White's point of view.

use crate::{Evaluation, Position};

/// Rewrite every score in `evaluation` so that positive favors White.
///
/// The engine reports scores for the side to move in `fen`, so Black-to-move
/// scores are negated. A missing or unknown side-to-move field leaves the
/// evaluation untouched.
pub fn normalize(evaluation: Evaluation, fen: &str) -> Evaluation {
    match Position::side_of(fen) {
        Some(side) => evaluation.signed(side.sign()),
        None => evaluation,
    }
}
