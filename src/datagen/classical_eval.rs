//! The `Evaluate(position)` capability required by the sampler (§6): "a
//! synchronous static scalar evaluator (classical, not NNUE) returning
//! centipawns from side-to-move POV." Board representation beyond piece
//! placement is out of scope (§1), so this is material-count only — enough
//! to give the WDL-disagreement and eval-confirmed-extreme filters a
//! baseline to compare the NNUE score against, not a competitive evaluator.

use crate::chess::piece::{Colour, PieceType};
use crate::chess::position::Position;

const PAWN: i32 = 100;
const KNIGHT: i32 = 320;
const BISHOP: i32 = 330;
const ROOK: i32 = 500;
const QUEEN: i32 = 900;

fn piece_value(piece_type: PieceType) -> i32 {
    match piece_type {
        PieceType::Pawn => PAWN,
        PieceType::Knight => KNIGHT,
        PieceType::Bishop => BISHOP,
        PieceType::Rook => ROOK,
        PieceType::Queen => QUEEN,
        PieceType::King => 0,
    }
}

fn material_for(position: &Position, colour: Colour) -> i32 {
    PieceType::NON_KING
        .iter()
        .map(|&pt| position.pieces_of(colour, pt).count() as i32 * piece_value(pt))
        .sum()
}

/// Static material evaluation, centipawns from the side-to-move's POV.
pub fn evaluate(position: &Position) -> i32 {
    let stm = position.side_to_move;
    material_for(position, stm) - material_for(position, stm.flip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_is_balanced() {
        assert_eq!(evaluate(&Position::startpos()), 0);
    }
}
