//! Bitwise operations modelling NOR flash programming.
//!
//! NOR cells can only be programmed from `1` to `0`. Setting a bit back to `1`
//! requires erasing the whole block that contains it, which turns every byte
//! of the block back into the erased value `0xFF`.

use core::ops::{BitAnd, BitOr};

/// Value every byte takes after a block erase.
pub const ERASED_BYTE: u8 = 0xFF;

/// Checks that every '1' bit is a '1' on the
/// right hand side.
pub trait BitSubset: Copy {
    fn is_subset_of(self, rhs: Self) -> bool;
}

impl<U: Copy + BitOr<Output = Self> + PartialEq> BitSubset for U {
    fn is_subset_of(self, rhs: Self) -> bool { (self | rhs) == rhs }
}

/// Result of programming `data` over cells currently holding `current`.
/// Bits can only be cleared, so the outcome is the bitwise AND of both.
pub fn program<U: Copy + BitAnd<Output = U>>(current: U, data: U) -> U { current & data }

/// Whether every byte in the range holds the erased value.
pub fn is_erased(bytes: &[u8]) -> bool { bytes.iter().all(|b| *b == ERASED_BYTE) }
