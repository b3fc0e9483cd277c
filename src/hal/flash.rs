//! Flash interfaces.
//!
//! Addresses are byte offsets into the flash device. Flash is assumed to
//! follow NOR semantics: a write can only clear bits, and only an erase
//! brings a whole block back to the all-ones erased state.
use core::fmt;

/// Reads a range of bytes at a byte offset.
pub trait Read {
    type Error: Clone + Copy + fmt::Debug;
    fn read(&mut self, address: u32, bytes: &mut [u8]) -> nb::Result<(), Self::Error>;
    /// Total size in bytes of the device.
    fn size(&self) -> usize;
}

/// Programs a range of bytes. This is a raw program operation: it does
/// *not* erase first, so it can only turn `1` bits into `0` bits.
pub trait Write: Read {
    fn write(&mut self, address: u32, bytes: &[u8]) -> nb::Result<(), Self::Error>;
}

/// Erases every block overlapping the given range back to `0xFF`.
pub trait Erase: Read {
    fn erase(&mut self, address: u32, size: usize) -> nb::Result<(), Self::Error>;
    /// Size of the smallest erasable region.
    fn erase_size(&self) -> usize;
}

/// Toggle guarding the device against accidental writes and erases.
pub trait WriteProtect: Read {
    fn set_write_protection(&mut self, enabled: bool) -> nb::Result<(), Self::Error>;
}
