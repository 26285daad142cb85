//! Component A — the feature encoder. Maps `(position, perspective)` to a
//! sparse index into the 736-wide input space (§3 of the design spec):
//! own pawns/knights/bishops/rooks/queens (5·64), own king (32 slots,
//! `4·rank + file`), opponent pawns/knights/bishops/rooks/queens (5·64),
//! opponent king (64 slots).

use arrayvec::ArrayVec;

use crate::chess::piece::{Colour, Piece, PieceType};
use crate::chess::position::Position;
use crate::chess::squareset::SquareSet;
use crate::chess::types::Square;

/// Total width of the sparse input layer.
pub const INPUT_SIZE: usize = 32 + 64 + 10 * 64;

const OWN_KING_SUBSPACE: usize = 32;
const PER_PIECE_STRIDE: usize = 64;
const OWN_NON_KING_BASE: usize = 0;
const OWN_KING_BASE: usize = 5 * PER_PIECE_STRIDE;
const OPP_NON_KING_BASE: usize = OWN_KING_BASE + OWN_KING_SUBSPACE;
const OPP_KING_BASE: usize = OPP_NON_KING_BASE + 5 * PER_PIECE_STRIDE;

const _LAYOUT_CHECK: () = assert!(OPP_KING_BASE + 64 == INPUT_SIZE);

/// Up to 64 feature indices can be live in a position (32 pieces, each
/// contributing one index per perspective call).
pub type FeatureList = ArrayVec<u16, 64>;

/// Apply the perspective/flip rule (§3): rank-flip if `perspective` is Black,
/// file-flip if the side-to-move's king sits on files e-h. Both may apply;
/// they combine by XOR on the 6-bit square index.
fn flip_square(square: Square, perspective: Colour, own_king_on_e_to_h: bool) -> Square {
    let mut sq = square;
    if perspective == Colour::Black {
        sq = sq.flip_rank();
    }
    if own_king_on_e_to_h {
        sq = sq.flip_file();
    }
    sq
}

fn own_king_crosses_file_boundary(position: &Position, perspective: Colour) -> bool {
    position.king_sq(perspective).file().index() >= 4
}

/// Feature index contributed by a single piece, for one perspective. Exactly
/// what `features()` would emit for the same `(piece, square, perspective)`
/// — the cross-cut invariant between refresh and incremental update (§4.A).
pub fn delta_index(piece: Piece, square: Square, position: &Position, perspective: Colour) -> u16 {
    let own_king_flips = own_king_crosses_file_boundary(position, perspective);
    let flipped = flip_square(square, perspective, own_king_flips);

    let is_own = piece.colour == perspective;
    let base = match (is_own, piece.piece_type) {
        (true, PieceType::King) => {
            let rank = flipped.rank().index();
            let file = flipped.file().index();
            debug_assert!(file < 4, "own king must be on files a-d after flipping");
            return (OWN_KING_BASE + 4 * rank + file) as u16;
        }
        (true, pt) => OWN_NON_KING_BASE + non_king_slot(pt) * PER_PIECE_STRIDE,
        (false, PieceType::King) => {
            return (OPP_KING_BASE + flipped.index()) as u16;
        }
        (false, pt) => OPP_NON_KING_BASE + non_king_slot(pt) * PER_PIECE_STRIDE,
    };
    (base + flipped.index()) as u16
}

fn non_king_slot(piece_type: PieceType) -> usize {
    PieceType::NON_KING
        .iter()
        .position(|&pt| pt == piece_type)
        .expect("non-king piece type")
}

/// Enumerate every feature index active in `position` from `perspective`'s
/// point of view. Iterates own pieces then opponent pieces, each in the
/// fixed pawn/knight/bishop/rook/queen/king order — this order is
/// arbitrary for correctness but must stay fixed so refresh and
/// incremental-update paths agree (§4.A).
pub fn features(position: &Position, perspective: Colour) -> FeatureList {
    let mut out = FeatureList::new();
    for &colour in &[perspective, perspective.flip()] {
        for piece_type in PieceType::ALL {
            let bb: SquareSet = position.pieces_of(colour, piece_type);
            for square in bb.iter() {
                let piece = Piece::new(colour, piece_type);
                out.push(delta_index(piece, square, position, perspective));
            }
        }
    }
    out
}

/// The 16-way network variant bucket (§3): `queens_present*8 +
/// min(num_non_king_pieces/4, 7)`.
pub fn variant(position: &Position) -> u32 {
    let queen_term = u32::from(position.queens_present()) * 8;
    let material_term = (position.num_non_king_pieces() / 4).min(7);
    queen_term + material_term
}

/// The king-square bucket used by the sampler's "King bucket" filter (§4.D).
/// Not specified further by the design spec beyond "neither side's bucket
/// equals king_bucket"; implemented by reusing this module's own 32-slot
/// `4*rank + file` king subspace addressing (§3), mirroring the file to the
/// a-d half of the board the same way `OWN_KING_BASE` does, rather than
/// inventing a second, unrelated bucketing scheme. Absolute (not
/// perspective-flipped): filters select on where a king *actually* sits on
/// the board, independent of which side is to move.
pub fn king_bucket(position: &Position, colour: Colour) -> u16 {
    let king_sq = position.king_sq(colour);
    let rank = king_sq.rank().index();
    let file = king_sq.file().index();
    let mirrored_file = file.min(7 - file);
    (4 * rank + mirrored_file) as u16
}
