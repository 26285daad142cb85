//! Component E — the position codec. `PositionEntry` is the exact 32-byte
//! on-disk record of §6: a packed board plus `score`, `wdl_score`, and short
//! counters. The 32-byte size is a hard external contract, checked by a
//! `const` assertion (teacher's `static_assert`-by-const-block idiom).
//!
//! Grounded on the teacher's `datagen/dataformat.rs` `PackedBoard` and its
//! nested `mod util` of little-endian newtype wrappers, re-laid-out to this
//! spec's field set and order rather than the teacher's own.

use thiserror::Error;

use crate::chess::piece::{Colour, Piece, PieceType};
use crate::chess::position::Position;
use crate::chess::squareset::SquareSet;
use crate::chess::types::Square;

/// WDL label attached to a training record (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Wdl {
    WhiteWins = 0,
    Draw = 1,
    BlackWins = 2,
}

impl Wdl {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::WhiteWins),
            1 => Some(Self::Draw),
            2 => Some(Self::BlackWins),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("record is {len} bytes, expected exactly {expected}")]
    WrongLength { len: usize, expected: usize },
    #[error("wdl_score byte {0} is not a valid Wdl discriminant")]
    InvalidWdl(u8),
    #[error("packed record encodes more than one king for colour {0:?}")]
    MultipleKings(Colour),
}

/// Size of a `PositionEntry` on disk, in bytes. A binding wire contract with
/// producers (§6).
pub const ENTRY_SIZE: usize = 32;

/// Exactly 32 bytes, little-endian, no padding (§6).
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct PositionEntry {
    occupancy: util::U64Le,
    pieces: util::U4Array32,
    stm_ep_square: u8,
    half_move_count: u8,
    move_count: util::U16Le,
    score: util::I16Le,
    wdl_score: u8,
    extra: u8,
}

const _ENTRY_SIZE_CHECK: () = assert!(
    std::mem::size_of::<PositionEntry>() == ENTRY_SIZE,
    "PositionEntry must be exactly 32 bytes: it is a binding wire contract"
);

/// Sentinel "no en-passant square" value for the 7-bit square field.
const NO_EP_SQUARE: u8 = 0x7F;

impl PositionEntry {
    pub fn pack(position: &Position, score: i16, wdl: Wdl, extra: u8) -> Self {
        let occupancy = position.colour_bb(Colour::White) | position.colour_bb(Colour::Black);

        let mut pieces = util::U4Array32::default();
        for (i, sq) in occupancy.iter().enumerate() {
            let piece = position.piece_at(sq).expect("occupied square must hold a piece");
            let code = piece.piece_type.index() as u8 | (piece.colour.index() as u8) << 3;
            pieces.set(i, code);
        }

        let ep_bits = position.ep_square.map_or(NO_EP_SQUARE, |sq| sq.index() as u8);
        let stm_bit = (position.side_to_move.index() as u8) << 7;

        Self {
            occupancy: util::U64Le::new(occupancy.inner()),
            pieces,
            stm_ep_square: stm_bit | ep_bits,
            half_move_count: position.halfmove_clock,
            move_count: util::U16Le::new(position.fullmove_number),
            score: util::I16Le::new(score),
            wdl_score: wdl as u8,
            extra,
        }
    }

    pub fn score(&self) -> i16 {
        self.score.get()
    }

    pub fn wdl(&self) -> Result<Wdl, CodecError> {
        Wdl::from_u8(self.wdl_score).ok_or(CodecError::InvalidWdl(self.wdl_score))
    }

    pub fn half_move_count(&self) -> u8 {
        self.half_move_count
    }

    pub fn move_count(&self) -> u16 {
        self.move_count.get()
    }

    pub fn extra(&self) -> u8 {
        self.extra
    }

    /// Copy these 32 bytes into an owned `PositionEntry`. `PositionEntry`
    /// contains a `U64Le` field and so has alignment 8, while callers read
    /// records into plain `[u8; ENTRY_SIZE]` buffers of alignment 1 —
    /// casting such a slice's pointer to `&Self` would be UB, so this reads
    /// unaligned instead (teacher-equivalent: `transmute`s a properly
    /// aligned array, never a raw byte-slice pointer).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != ENTRY_SIZE {
            return Err(CodecError::WrongLength { len: bytes.len(), expected: ENTRY_SIZE });
        }
        // SAFETY: PositionEntry is `repr(C)`, has no padding (checked by the
        // size assertion above), and every bit pattern of its fields is
        // valid except `wdl_score`, which `unpack` validates separately.
        // `read_unaligned` tolerates `bytes`'s alignment-1 provenance.
        Ok(unsafe { bytes.as_ptr().cast::<Self>().read_unaligned() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: PositionEntry is `repr(C)` with no padding.
        unsafe { std::slice::from_raw_parts((self as *const Self).cast::<u8>(), ENTRY_SIZE) }
    }

    /// Unpack into a full [`Position`]; returns an error on invalid packing
    /// (a fatal consistency error in training, per §7).
    pub fn unpack(&self) -> Result<Position, CodecError> {
        self.wdl()?;

        let mut position = Position::empty();
        for (i, sq) in SquareSet::from_inner(self.occupancy.get()).iter().enumerate() {
            let code = self.pieces.get(i);
            let colour = if code & 0b1000 != 0 { Colour::Black } else { Colour::White };
            let piece_type_index = code & 0b0111;
            let piece_type = PieceType::ALL
                .into_iter()
                .find(|pt| pt.index() as u8 == piece_type_index)
                .expect("piece-type nibble is always one of the six known values");
            position.set_piece_at(sq, Piece::new(colour, piece_type));
        }

        for colour in [Colour::White, Colour::Black] {
            if position.pieces_of(colour, PieceType::King).count() > 1 {
                return Err(CodecError::MultipleKings(colour));
            }
        }

        position.side_to_move = if self.stm_ep_square & 0x80 != 0 { Colour::Black } else { Colour::White };
        let ep_bits = self.stm_ep_square & 0x7F;
        position.ep_square = if ep_bits == NO_EP_SQUARE { None } else { Some(Square::new(ep_bits)) };
        position.halfmove_clock = self.half_move_count;
        position.fullmove_number = self.move_count.get();

        Ok(position)
    }
}

/// `unpack_position(packed, out_position)` from §4.E, expressed as a
/// fallible constructor rather than an out-parameter (idiomatic Rust: a
/// `Result` return communicates the same "returns false on invalid
/// packing" contract without a sentinel).
pub fn unpack_position(bytes: &[u8]) -> Result<(Position, PositionEntry), CodecError> {
    let entry = PositionEntry::from_bytes(bytes)?;
    let position = entry.unpack()?;
    Ok((position, entry))
}

mod util {
    #[derive(Copy, Clone, Debug, Default)]
    #[repr(transparent)]
    pub struct U64Le(u64);

    impl U64Le {
        pub const fn new(v: u64) -> Self {
            Self(v.to_le())
        }
        pub const fn get(self) -> u64 {
            u64::from_le(self.0)
        }
    }

    #[derive(Copy, Clone, Debug, Default)]
    #[repr(transparent)]
    pub struct U16Le(u16);

    impl U16Le {
        pub const fn new(v: u16) -> Self {
            Self(v.to_le())
        }
        pub const fn get(self) -> u16 {
            u16::from_le(self.0)
        }
    }

    #[derive(Copy, Clone, Debug, Default)]
    #[repr(transparent)]
    pub struct I16Le(i16);

    impl I16Le {
        pub const fn new(v: i16) -> Self {
            Self(v.to_le())
        }
        pub const fn get(self) -> i16 {
            i16::from_le(self.0)
        }
    }

    #[derive(Copy, Clone, Debug, Default)]
    #[repr(transparent)]
    pub struct U4Array32([u8; 16]);

    impl U4Array32 {
        pub const fn get(&self, i: usize) -> u8 {
            (self.0[i / 2] >> ((i % 2) * 4)) & 0xF
        }

        pub fn set(&mut self, i: usize, v: u8) {
            debug_assert!(v < 0x10);
            self.0[i / 2] |= v << ((i % 2) * 4);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_exactly_32_bytes() {
        assert_eq!(std::mem::size_of::<PositionEntry>(), 32);
    }

    #[test]
    fn e10_codec_roundtrip() {
        let position = Position::startpos();
        let entry = PositionEntry::pack(&position, 17, Wdl::Draw, 0);
        let unpacked = entry.unpack().expect("startpos should unpack cleanly");
        assert_eq!(unpacked.num_pieces(), position.num_pieces());
        assert_eq!(unpacked.side_to_move, position.side_to_move);
        assert_eq!(unpacked.halfmove_clock, position.halfmove_clock);
        assert_eq!(unpacked.fullmove_number, position.fullmove_number);
        assert_eq!(entry.score(), 17);
        assert_eq!(entry.wdl().unwrap(), Wdl::Draw);
    }

    #[test]
    fn e11_rejects_truncated_input() {
        let bytes = [0u8; 31];
        let err = PositionEntry::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, CodecError::WrongLength { len: 31, expected: 32 });
    }

    #[test]
    fn bytes_roundtrip_through_as_bytes() {
        let position = Position::startpos();
        let entry = PositionEntry::pack(&position, -42, Wdl::BlackWins, 3);
        let bytes = entry.as_bytes().to_vec();
        assert_eq!(bytes.len(), ENTRY_SIZE);
        let (unpacked, roundtripped) = unpack_position(&bytes).expect("valid bytes");
        assert_eq!(unpacked.side_to_move, position.side_to_move);
        assert_eq!(roundtripped.score(), -42);
    }

    #[test]
    fn rejects_invalid_wdl_byte() {
        let position = Position::startpos();
        let mut entry = PositionEntry::pack(&position, 0, Wdl::Draw, 0);
        entry.wdl_score = 9;
        assert!(entry.unpack().is_err());
    }
}
