//! A minimal arena of search nodes addressed by explicit parent indices
//! (§9 Design Notes: "model the search tree as an indexed arena of nodes
//! with explicit parent indices"). Grounded on the `ArenaIndex`/`Arena`
//! pattern used for tree storage elsewhere in this engine family, reduced
//! here to just enough to exercise the incremental evaluator — no LRU
//! eviction, no cross-move tree reuse, no hashing.

use std::num::NonZeroU32;
use std::ops::{Index, IndexMut};

use arrayvec::ArrayVec;

use crate::chess::position::{DirtyPiece, Position};
use crate::nnue::accumulator::{NnContext, DIRTY_PIECE_CAP};

/// A niche-optimised index into an [`Arena`]. Stored as `value ^ u32::MAX`
/// so that the all-ones bit pattern (never a valid offset-plus-one) is free
/// for `Option<NodeIndex>` to use as its `None` representation, at no extra
/// size over a bare `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIndex(NonZeroU32);

const _NODE_INDEX_NICHE_CHECK: () = assert!(
    std::mem::size_of::<NodeIndex>() == std::mem::size_of::<Option<NodeIndex>>(),
    "NodeIndex should be niche-optimisable inside Option"
);

impl From<usize> for NodeIndex {
    fn from(value: usize) -> Self {
        let encoded = (value as u32) ^ u32::MAX;
        Self(NonZeroU32::new(encoded).expect("arena index must not encode to zero"))
    }
}

impl From<NodeIndex> for usize {
    fn from(index: NodeIndex) -> Self {
        (index.0.get() ^ u32::MAX) as usize
    }
}

pub struct SearchNode<const HIDDEN: usize> {
    pub position: Position,
    pub nn: NnContext<HIDDEN>,
}

/// Strict-tree storage for search nodes. Nodes are only ever appended;
/// parent indices always point to an earlier (already-inserted) node, so
/// cyclic ownership is impossible by construction.
pub struct Arena<const HIDDEN: usize> {
    nodes: Vec<SearchNode<HIDDEN>>,
}

impl<const HIDDEN: usize> Arena<HIDDEN> {
    pub fn with_root(position: Position) -> Self {
        Self {
            nodes: vec![SearchNode { position, nn: NnContext::root() }],
        }
    }

    pub fn root(&self) -> NodeIndex {
        NodeIndex::from(0usize)
    }

    /// Insert a child of `parent`, describing the board delta with
    /// `dirty_pieces`, and return its index.
    pub fn insert_child(
        &mut self,
        parent: NodeIndex,
        position: Position,
        dirty_pieces: ArrayVec<DirtyPiece, DIRTY_PIECE_CAP>,
    ) -> NodeIndex {
        let index = NodeIndex::from(self.nodes.len());
        self.nodes.push(SearchNode {
            position,
            nn: NnContext::child(parent, dirty_pieces),
        });
        index
    }

    pub fn parent_of(&self, index: NodeIndex) -> Option<NodeIndex> {
        self[index].nn.parent
    }
}

impl<const HIDDEN: usize> Index<NodeIndex> for Arena<HIDDEN> {
    type Output = SearchNode<HIDDEN>;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[usize::from(index)]
    }
}

impl<const HIDDEN: usize> IndexMut<NodeIndex> for Arena<HIDDEN> {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[usize::from(index)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_index_roundtrips() {
        for raw in [0usize, 1, 2, 1000] {
            let idx = NodeIndex::from(raw);
            assert_eq!(usize::from(idx), raw);
        }
    }

    #[test]
    fn option_node_index_is_niche_optimised() {
        assert_eq!(
            std::mem::size_of::<Option<NodeIndex>>(),
            std::mem::size_of::<NodeIndex>()
        );
    }

    #[test]
    fn arena_parent_chain() {
        let mut arena: Arena<4> = Arena::with_root(Position::startpos());
        let root = arena.root();
        let child = arena.insert_child(root, Position::startpos(), ArrayVec::new());
        assert_eq!(arena.parent_of(child), Some(root));
        assert_eq!(arena.parent_of(root), None);
    }
}
