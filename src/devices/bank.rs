//! Flash bank geometry.
//!
//! Flash holds exactly two equally sized image banks. Bank 0 holds the image
//! currently executing, bank 1 is the staging area updates are written to.
//! Every bank ends with a boot trailer.

use super::trailer::TRAILER_SIZE;
use crate::{configuration, error::Error};
use static_assertions::const_assert;

const_assert!(configuration::BANK_SIZE > TRAILER_SIZE);

/// Image bank descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bank {
    /// Numeric identifier of the bank (0 = running, 1 = staging).
    pub index: u8,
    /// Byte offset of the start of the bank into flash.
    pub location: u32,
    /// Size in bytes of the flash range occupied by this bank, trailer included.
    pub size: usize,
}

impl Bank {
    /// Bytes available to the image ahead of the trailer.
    pub fn payload_size(&self) -> usize { self.size.saturating_sub(TRAILER_SIZE) }

    /// Offset of the boot trailer, at the very end of the bank.
    pub fn trailer_location(&self) -> u32 { self.location + self.payload_size() as u32 }

    /// Whether this is the bank the application executes from.
    pub fn is_running(&self) -> bool { self.index == RUNNING_BANK }
}

pub const RUNNING_BANK: u8 = 0;
pub const STAGING_BANK: u8 = 1;

/// Both banks of a flash device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryMap {
    banks: [Bank; 2],
}

impl MemoryMap {
    /// Builds a memory map from two bank offsets sharing a bank size. Banks
    /// must be large enough to hold a trailer and some payload.
    pub fn new(running_offset: u32, staging_offset: u32, bank_size: usize) -> Result<Self, Error> {
        if bank_size <= TRAILER_SIZE {
            return Err(Error::ConfigurationError("Bank too small to hold a boot trailer"));
        }
        Ok(Self::from_offsets(running_offset, staging_offset, bank_size))
    }

    /// Memory map generated from the board configuration file.
    pub const fn configured() -> Self {
        Self::from_offsets(
            configuration::BANK_0_OFFSET,
            configuration::BANK_1_OFFSET,
            configuration::BANK_SIZE,
        )
    }

    const fn from_offsets(running_offset: u32, staging_offset: u32, bank_size: usize) -> Self {
        Self {
            banks: [
                Bank { index: RUNNING_BANK, location: running_offset, size: bank_size },
                Bank { index: STAGING_BANK, location: staging_offset, size: bank_size },
            ],
        }
    }

    pub fn running(&self) -> Bank { self.banks[RUNNING_BANK as usize] }

    pub fn staging(&self) -> Bank { self.banks[STAGING_BANK as usize] }

    pub fn bank(&self, index: u8) -> Result<Bank, Error> {
        self.banks.get(index as usize).copied().ok_or(Error::BankInvalid)
    }

    /// Returns an iterator of both banks.
    pub fn banks(&self) -> impl Iterator<Item = Bank> + '_ { self.banks.iter().copied() }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trailers_sit_at_the_end_of_each_bank() {
        // Given
        let map = MemoryMap::new(0x1000, 0x5000, kb!(16)).unwrap();

        // Then
        assert_eq!(map.running().trailer_location(), 0x1000 + 0x4000 - 32);
        assert_eq!(map.staging().trailer_location(), 0x5000 + 0x4000 - 32);
        assert!(map.running().is_running());
        assert!(!map.staging().is_running());
    }

    #[test]
    fn unknown_banks_are_invalid() {
        let map = MemoryMap::new(0, kb!(4) as u32, kb!(4)).unwrap();
        assert_eq!(map.bank(1).unwrap(), map.staging());
        assert_eq!(map.bank(2), Err(Error::BankInvalid));
        assert_eq!(map.banks().count(), 2);
    }

    #[test]
    fn banks_too_small_for_a_trailer_are_rejected() {
        assert!(matches!(MemoryMap::new(0, 0x100, 16), Err(Error::ConfigurationError(_))));
        assert!(MemoryMap::new(0, 0x100, TRAILER_SIZE).is_err());
        assert_eq!(MemoryMap::new(0, 0x100, TRAILER_SIZE + 1).unwrap().running().payload_size(), 1);

        let stray = Bank { index: 1, location: 0x100, size: 8 };
        assert_eq!(stray.payload_size(), 0);
        assert_eq!(stray.trailer_location(), 0x100);
    }

    #[test]
    fn configured_banks_match_generated_geometry() {
        let map = MemoryMap::configured();
        assert_eq!(map.running().location, configuration::BANK_0_OFFSET);
        assert_eq!(map.staging().size, configuration::BANK_SIZE);
        assert!(configuration::BANK_SIZE > TRAILER_SIZE);
    }
}
