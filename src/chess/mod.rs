pub mod piece;
pub mod position;
pub mod squareset;
pub mod types;
