//! The incremental NNUE evaluator: feature encoding (Component A),
//! accumulator storage (Component B), the incremental evaluation algorithm
//! (Component C), and the supporting opaque network and search-tree arena.

pub mod accumulator;
pub mod arena;
pub mod evaluator;
pub mod feature;
pub mod network;
