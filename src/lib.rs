#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Incremental NNUE evaluation and training-data sampling for a chess
//! engine's supervised trainer. `chess` provides just enough board state to
//! drive feature encoding and the on-disk codec; `nnue` is the feature
//! encoder, accumulator store, and incremental evaluator; `datagen` is the
//! sampling stream and position codec that feed the trainer.

pub mod chess;
pub mod datagen;
pub mod nnue;
pub mod stats;
