//! Minimal square/file/rank types — just enough to drive feature encoding
//! and the position codec. No move generation lives here.

use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl File {
    pub const ALL: [Self; 8] = [
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::H,
    ];

    pub const fn from_index(index: u8) -> Self {
        debug_assert!(index < 8, "file index out of range");
        // SAFETY: File is repr(u8) with variants 0..=7, checked above.
        unsafe { std::mem::transmute::<u8, Self>(index) }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = b'a' + self.index() as u8;
        write!(f, "{}", c as char)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

impl Rank {
    pub const ALL: [Self; 8] = [
        Self::One,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
    ];

    pub const fn from_index(index: u8) -> Self {
        debug_assert!(index < 8, "rank index out of range");
        // SAFETY: Rank is repr(u8) with variants 0..=7, checked above.
        unsafe { std::mem::transmute::<u8, Self>(index) }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index() + 1)
    }
}

/// A board square, `0 == a1` through `63 == h8`, file-major within rank
/// (`index = 8 * rank + file`) matching the bit order used by [`SquareSet`](super::squareset::SquareSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Square(u8);

const _SQUARE_NICHE_CHECK: () = assert!(
    std::mem::size_of::<Square>() == std::mem::size_of::<Option<Square>>(),
    "Square should be niche-optimisable inside Option"
);

impl Square {
    pub const fn new(index: u8) -> Self {
        debug_assert!(index < 64, "square index out of range");
        Self(index)
    }

    /// # Safety
    /// `index` must be less than 64.
    pub const unsafe fn new_unchecked(index: u8) -> Self {
        Self(index)
    }

    pub const fn from_rank_file(rank: Rank, file: File) -> Self {
        Self::new(rank.index() as u8 * 8 + file.index() as u8)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn file(self) -> File {
        File::from_index(self.0 & 0b111)
    }

    pub const fn rank(self) -> Rank {
        Rank::from_index(self.0 >> 3)
    }

    /// Flip the rank (vertical mirror): `a1 <-> a8`.
    pub const fn flip_rank(self) -> Self {
        Self(self.0 ^ 0b111_000)
    }

    /// Flip the file (horizontal mirror): `a1 <-> h1`.
    pub const fn flip_file(self) -> Self {
        Self(self.0 ^ 0b000_111)
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

impl<T> std::ops::Index<Square> for [T; 64] {
    type Output = T;
    fn index(&self, sq: Square) -> &T {
        // SAFETY: Square's invariant guarantees index() < 64.
        unsafe { self.get_unchecked(sq.index()) }
    }
}

impl<T> std::ops::IndexMut<Square> for [T; 64] {
    fn index_mut(&mut self, sq: Square) -> &mut T {
        // SAFETY: Square's invariant guarantees index() < 64.
        unsafe { self.get_unchecked_mut(sq.index()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_flipping() {
        let e1 = Square::from_rank_file(Rank::One, File::E);
        assert_eq!(e1.flip_rank(), Square::from_rank_file(Rank::Eight, File::E));
        assert_eq!(e1.flip_file(), Square::from_rank_file(Rank::One, File::D));
        assert_eq!(e1.flip_rank().flip_rank(), e1);
        assert_eq!(e1.flip_file().flip_file(), e1);
    }

    #[test]
    fn square_file_rank_roundtrip() {
        for idx in 0..64u8 {
            let sq = Square::new(idx);
            assert_eq!(Square::from_rank_file(sq.rank(), sq.file()), sq);
        }
    }
}
