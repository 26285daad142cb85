//! Component C — the incremental evaluator, the central algorithm of this
//! subsystem (§4.C). Walks the parent chain of a search node to find the
//! cheapest way to materialise each perspective's accumulator: reuse it
//! verbatim (cached), incrementally update it from the nearest valid
//! ancestor (single-stage, or two-stage when a dirty parent's own update
//! can be shared with a sibling), or fall back to a full refresh.

use arrayvec::ArrayVec;

use crate::chess::piece::Colour;
use crate::chess::position::Position;
use crate::nnue::accumulator::{DIRTY_PIECE_CAP, INVALID_SCORE};
use crate::nnue::arena::{Arena, NodeIndex};
use crate::nnue::feature::{self, delta_index};
use crate::nnue::network::{NetworkAccumulator, NnueParams};

/// Cap on the combined `added`/`removed` lists walked during an update
/// (§4.C: "accumulating dirty pieces into two bounded arrays ... cap 64").
const UPDATE_LIST_CAP: usize = DIRTY_PIECE_CAP;

fn king_side_is_low_files(position: &Position, perspective: Colour) -> bool {
    position.king_sq(perspective).file().index() < 4
}

/// The outcome of the per-perspective ancestor search: where (if anywhere)
/// a valid accumulator was found within budget.
enum Resolution {
    /// `node` itself already has a valid accumulator.
    Cached,
    /// Update directly from `prev`.
    SingleStage { prev: NodeIndex },
    /// `prev`'s accumulator feeds an update into `parent`, which then feeds
    /// an update into `node`. Shares the parent's update across siblings.
    TwoStage { prev: NodeIndex, parent: NodeIndex },
    /// No usable ancestor within budget (or none at all): do a full refresh.
    Refresh,
}

fn resolve<const HIDDEN: usize>(arena: &Arena<HIDDEN>, node: NodeIndex, perspective: Colour) -> Resolution {
    let refresh_cost = arena[node].position.num_pieces();
    let mut update_cost = 0u32;
    let mut prev_accum_node = None;
    let king_side_here = king_side_is_low_files(&arena[node].position, perspective);

    let mut n = node;
    loop {
        update_cost += arena[n].nn.dirty_pieces.len() as u32;
        if update_cost > refresh_cost {
            break;
        }
        if king_side_is_low_files(&arena[n].position, perspective) != king_side_here {
            break;
        }
        if !arena[n].nn.accum_dirty[perspective.index()] {
            prev_accum_node = Some(n);
            break;
        }
        match arena.parent_of(n) {
            Some(parent) => n = parent,
            None => break,
        }
    }

    if prev_accum_node == Some(node) {
        return Resolution::Cached;
    }

    if let Some(parent) = arena.parent_of(node) {
        if let Some(prev) = prev_accum_node {
            if parent != prev && arena[parent].nn.accum_dirty[perspective.index()] {
                return Resolution::TwoStage { prev, parent };
            }
        }
    }

    match prev_accum_node {
        Some(prev) => Resolution::SingleStage { prev },
        None => Resolution::Refresh,
    }
}

/// Walk upward from `from` (inclusive) up to but excluding `stop_at`,
/// collecting this span's dirty pieces into capped `added`/`removed` index
/// lists, each index computed in `target`'s frame (the descendant whose
/// accumulator is being produced — the king-file guard in [`resolve`]
/// ensures every intermediate state shares `target`'s flip configuration).
fn collect_added_removed<const HIDDEN: usize>(
    arena: &Arena<HIDDEN>,
    from: NodeIndex,
    stop_at: Option<NodeIndex>,
    perspective: Colour,
    target: &Position,
) -> (ArrayVec<u16, UPDATE_LIST_CAP>, ArrayVec<u16, UPDATE_LIST_CAP>) {
    let mut added = ArrayVec::new();
    let mut removed = ArrayVec::new();

    let mut n = from;
    loop {
        if Some(n) == stop_at {
            break;
        }
        for dp in &arena[n].nn.dirty_pieces {
            if let Some(to) = dp.to_square {
                added.push(delta_index(dp.piece, to, target, perspective));
            }
            if let Some(from_sq) = dp.from_square {
                removed.push(delta_index(dp.piece, from_sq, target, perspective));
            }
        }
        match arena.parent_of(n) {
            Some(parent) => n = parent,
            None => break,
        }
    }

    cancel_pairs(&mut added, &mut removed);
    (added, removed)
}

/// Pairwise-cancel equal indices appearing in both lists (§4.C
/// "Cancellation"). O(|added|·|removed|), intentionally not a hash set —
/// the 64-element cap makes the constant factor dominate (§9).
fn cancel_pairs(added: &mut ArrayVec<u16, UPDATE_LIST_CAP>, removed: &mut ArrayVec<u16, UPDATE_LIST_CAP>) {
    let mut i = 0;
    while i < added.len() {
        if let Some(pos) = removed.iter().position(|&r| r == added[i]) {
            removed.remove(pos);
            added.remove(i);
        } else {
            i += 1;
        }
    }
}

fn materialise<const HIDDEN: usize>(
    network: &NnueParams,
    arena: &mut Arena<HIDDEN>,
    node: NodeIndex,
    perspective: Colour,
    prev: NodeIndex,
) {
    let (added, removed) = collect_added_removed(arena, node, Some(prev), perspective, &arena[node].position);
    let prev_accumulator = arena[prev].nn.accumulator[perspective.index()];
    let out = if added.is_empty() && removed.is_empty() {
        prev_accumulator
    } else {
        let mut out = NetworkAccumulator::new();
        network.update(&prev_accumulator, &added, &removed, &mut out);
        out
    };
    arena[node].nn.accumulator[perspective.index()] = out;
    arena[node].nn.accum_dirty[perspective.index()] = false;
    crate::stats::record_update();
}

fn refresh<const HIDDEN: usize>(network: &NnueParams, arena: &mut Arena<HIDDEN>, node: NodeIndex, perspective: Colour) {
    let feats = feature::features(&arena[node].position, perspective);
    let mut out = NetworkAccumulator::new();
    network.refresh(&feats, &mut out);
    arena[node].nn.accumulator[perspective.index()] = out;
    arena[node].nn.accum_dirty[perspective.index()] = false;
    crate::stats::record_refresh();
}

fn resolve_perspective<const HIDDEN: usize>(
    network: &NnueParams,
    arena: &mut Arena<HIDDEN>,
    node: NodeIndex,
    perspective: Colour,
) {
    if !arena[node].nn.accum_dirty[perspective.index()] {
        return;
    }
    match resolve(arena, node, perspective) {
        Resolution::Cached => {
            debug_assert!(!arena[node].nn.accum_dirty[perspective.index()]);
        }
        Resolution::SingleStage { prev } => materialise(network, arena, node, perspective, prev),
        Resolution::TwoStage { prev, parent } => {
            materialise(network, arena, parent, perspective, prev);
            materialise(network, arena, node, perspective, parent);
        }
        Resolution::Refresh => refresh(network, arena, node, perspective),
    }
}

/// Entry point: `evaluate(network, node) -> int32` (§4.C).
pub fn evaluate<const HIDDEN: usize>(network: &NnueParams, arena: &mut Arena<HIDDEN>, node: NodeIndex) -> i32 {
    if arena[node].nn.nn_score != INVALID_SCORE {
        return arena[node].nn.nn_score;
    }

    resolve_perspective(network, arena, node, Colour::White);
    resolve_perspective(network, arena, node, Colour::Black);

    let stm = arena[node].position.side_to_move;
    let own = arena[node].nn.accumulator[stm.index()];
    let their = arena[node].nn.accumulator[stm.flip().index()];
    let bucket = feature::variant(&arena[node].position);
    let score = network.run(&own, &their, bucket);

    arena[node].nn.nn_score = score;
    score
}

/// Stateless fallback (§4.C): compute both feature vectors directly from a
/// bare position and call the network's stateless form. Used for validation
/// and out-of-tree evaluation (e.g. from the training filter).
pub fn evaluate_position(network: &NnueParams, position: &Position) -> i32 {
    let stm = position.side_to_move;
    let own_features = feature::features(position, stm);
    let their_features = feature::features(position, stm.flip());
    let bucket = feature::variant(position);
    network.run_stateless(&own_features, &their_features, bucket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::piece::{Piece, PieceType};
    use crate::chess::position::DirtyPiece;
    use crate::chess::types::{File, Rank, Square};
    use crate::nnue::network::NnueParams;

    fn net() -> Box<NnueParams> {
        NnueParams::zeroed()
    }

    #[test]
    fn root_node_evaluates_via_refresh() {
        let net = net();
        let mut arena: Arena<8> = Arena::with_root(Position::startpos());
        let root = arena.root();
        let score = evaluate(&net, &mut arena, root);
        assert_eq!(score, evaluate_position(&net, &Position::startpos()));
        // second call hits the cached fast path
        assert_eq!(evaluate(&net, &mut arena, root), score);
    }

    #[test]
    fn e3_incremental_equals_refresh_over_e2e4() {
        let net = net();
        let mut arena: Arena<8> = Arena::with_root(Position::startpos());
        let root = arena.root();

        let mut child_position = Position::startpos();
        let pawn = Piece::new(Colour::White, PieceType::Pawn);
        let e2 = Square::from_rank_file(Rank::Two, File::E);
        let e4 = Square::from_rank_file(Rank::Four, File::E);
        let dirty = DirtyPiece::movement(pawn, e2, e4);
        child_position.apply_dirty_pieces(&[dirty]);

        let mut dirty_list = ArrayVec::new();
        dirty_list.push(dirty);
        let child = arena.insert_child(root, child_position.clone(), dirty_list);

        let incremental = evaluate(&net, &mut arena, child);
        let refreshed = evaluate_position(&net, &child_position);
        assert_eq!(incremental, refreshed);
    }

    #[test]
    fn e5_king_crossing_file_boundary_forces_refresh() {
        // Move the White king from d1 to e1: king_side flips from low to
        // high files, so White's perspective must fall back to a full
        // refresh rather than an incremental update.
        let mut base = Position::empty();
        let d1 = Square::from_rank_file(Rank::One, File::D);
        let e1 = Square::from_rank_file(Rank::One, File::E);
        let wk = Piece::new(Colour::White, PieceType::King);
        let bk = Piece::new(Colour::Black, PieceType::King);
        base.set_piece_at(d1, wk);
        base.set_piece_at(Square::from_rank_file(Rank::Eight, File::E), bk);

        let net = net();
        let mut arena: Arena<8> = Arena::with_root(base.clone());
        let root = arena.root();
        evaluate(&net, &mut arena, root);

        let mut child_position = base.clone();
        let dirty = DirtyPiece::movement(wk, d1, e1);
        child_position.apply_dirty_pieces(&[dirty]);
        let mut dirty_list = ArrayVec::new();
        dirty_list.push(dirty);
        let child = arena.insert_child(root, child_position.clone(), dirty_list);

        match resolve(&arena, child, Colour::White) {
            Resolution::Refresh => {}
            _ => panic!("expected a forced refresh across the king-file boundary"),
        }
        let incremental = evaluate(&net, &mut arena, child);
        let refreshed = evaluate_position(&net, &child_position);
        assert_eq!(incremental, refreshed);
    }

    #[test]
    fn e4_capture_cancels_nothing() {
        let mut added: ArrayVec<u16, 64> = ArrayVec::new();
        let mut removed: ArrayVec<u16, 64> = ArrayVec::new();
        added.push(10);
        added.push(20);
        removed.push(30);
        cancel_pairs(&mut added, &mut removed);
        assert_eq!(added.as_slice(), &[10, 20]);
        assert_eq!(removed.as_slice(), &[30]);
    }

    #[test]
    fn e8_cancellation_fires_on_matching_indices() {
        let mut added: ArrayVec<u16, 64> = ArrayVec::new();
        let mut removed: ArrayVec<u16, 64> = ArrayVec::new();
        added.push(10);
        added.push(20);
        removed.push(20);
        removed.push(40);
        cancel_pairs(&mut added, &mut removed);
        assert_eq!(added.as_slice(), &[10]);
        assert_eq!(removed.as_slice(), &[40]);
    }

    #[test]
    fn e9_two_stage_sharing_matches_independent_refresh() {
        let net = net();
        let mut arena: Arena<8> = Arena::with_root(Position::startpos());
        let root = arena.root();

        let pawn = Piece::new(Colour::White, PieceType::Pawn);
        let e2 = Square::from_rank_file(Rank::Two, File::E);
        let e4 = Square::from_rank_file(Rank::Four, File::E);
        let mut parent_position = Position::startpos();
        let parent_dirty = DirtyPiece::movement(pawn, e2, e4);
        parent_position.apply_dirty_pieces(&[parent_dirty]);
        let mut parent_dirty_list = ArrayVec::new();
        parent_dirty_list.push(parent_dirty);
        let parent = arena.insert_child(root, parent_position.clone(), parent_dirty_list);

        let knight = Piece::new(Colour::Black, PieceType::Knight);
        let b8 = Square::from_rank_file(Rank::Eight, File::B);
        let c6 = Square::from_rank_file(Rank::Six, File::C);

        let mut child_a_position = parent_position.clone();
        let dirty_a = DirtyPiece::movement(knight, b8, c6);
        child_a_position.apply_dirty_pieces(&[dirty_a]);
        let mut dirty_a_list = ArrayVec::new();
        dirty_a_list.push(dirty_a);
        let child_a = arena.insert_child(parent, child_a_position.clone(), dirty_a_list);

        let g8 = Square::from_rank_file(Rank::Eight, File::G);
        let f6 = Square::from_rank_file(Rank::Six, File::F);
        let mut child_b_position = parent_position.clone();
        let knight_g = Piece::new(Colour::Black, PieceType::Knight);
        let dirty_b = DirtyPiece::movement(knight_g, g8, f6);
        child_b_position.apply_dirty_pieces(&[dirty_b]);
        let mut dirty_b_list = ArrayVec::new();
        dirty_b_list.push(dirty_b);
        let child_b = arena.insert_child(parent, child_b_position.clone(), dirty_b_list);

        let score_a = evaluate(&net, &mut arena, child_a);
        let score_b = evaluate(&net, &mut arena, child_b);

        assert_eq!(score_a, evaluate_position(&net, &child_a_position));
        assert_eq!(score_b, evaluate_position(&net, &child_b_position));
    }
}
