//! Component B — the accumulator store. A simple owned struct; no
//! algorithms live here (those belong to [`crate::nnue::network`] and
//! [`crate::nnue::evaluator`]).
//!
//! Unlike the teacher's `BasicAccumulator`, which bundles both
//! perspectives' hidden vectors into one struct (because its search always
//! advances both perspectives together), this `Accumulator` holds a single
//! perspective's vector — the design spec's per-perspective resolution
//! (§4.C) can settle White and Black at different ancestor depths, so they
//! need to be independently refreshable/updatable.

use arrayvec::ArrayVec;

use crate::chess::position::DirtyPiece;
use crate::nnue::arena::NodeIndex;

/// The dense hidden-layer activation vector of the first network layer, for
/// a single perspective.
#[derive(Debug, Clone, Copy)]
pub struct Accumulator<const HIDDEN: usize> {
    pub values: [i16; HIDDEN],
}

impl<const HIDDEN: usize> Accumulator<HIDDEN> {
    pub const fn new() -> Self {
        Self { values: [0; HIDDEN] }
    }

    pub fn zero_out(&mut self) {
        self.values.fill(0);
    }
}

impl<const HIDDEN: usize> Default for Accumulator<HIDDEN> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cap on the in-flight dirty-piece list per node, and on the accumulated
/// `added`/`removed` index lists walked during an incremental update (§4.C).
pub const DIRTY_PIECE_CAP: usize = 64;

/// Sentinel meaning "no cached score yet" for `nn_score`.
pub const INVALID_SCORE: i32 = i32::MIN;

/// The per-search-node NN context (§3): one pair of accumulators (one per
/// perspective), their dirty bits, the bounded dirty-piece list describing
/// the delta from the parent's position, and the cached final score.
#[derive(Debug, Clone)]
pub struct NnContext<const HIDDEN: usize> {
    pub accumulator: [Accumulator<HIDDEN>; 2],
    pub accum_dirty: [bool; 2],
    pub dirty_pieces: ArrayVec<DirtyPiece, DIRTY_PIECE_CAP>,
    pub nn_score: i32,
    pub parent: Option<NodeIndex>,
}

impl<const HIDDEN: usize> NnContext<HIDDEN> {
    pub fn root() -> Self {
        Self {
            accumulator: [Accumulator::new(); 2],
            accum_dirty: [true; 2],
            dirty_pieces: ArrayVec::new(),
            nn_score: INVALID_SCORE,
            parent: None,
        }
    }

    pub fn child(parent: NodeIndex, dirty_pieces: ArrayVec<DirtyPiece, DIRTY_PIECE_CAP>) -> Self {
        Self {
            accumulator: [Accumulator::new(); 2],
            accum_dirty: [true; 2],
            dirty_pieces,
            nn_score: INVALID_SCORE,
            parent: Some(parent),
        }
    }
}
