use super::error::FakeError;
use crate::{
    hal::flash,
    utilities::{
        bitwise::{program, BitSubset, ERASED_BYTE},
        memory::fits,
    },
};
use std::vec::Vec;

/// In-memory NOR flash.
///
/// Starts fully erased and write protected. Writes AND their data into the
/// cells like real NOR programming does; any attempt to set a cleared bit is
/// counted in `nor_violations` so tests can catch it. Failures can be injected
/// per operation kind.
#[derive(Clone, Debug)]
pub struct FakeFlash {
    data: Vec<u8>,
    erase_size: usize,
    protected: bool,
    fail_reads: bool,
    fail_writes: bool,
    fail_erases: bool,
    pub writes: usize,
    pub erases: usize,
    pub protection_toggles: usize,
    pub nor_violations: usize,
    pub write_log: Vec<(u32, Vec<u8>)>,
}

impl FakeFlash {
    pub fn new(size: usize, erase_size: usize) -> Self {
        Self {
            data: vec![ERASED_BYTE; size],
            erase_size,
            protected: true,
            fail_reads: false,
            fail_writes: false,
            fail_erases: false,
            writes: 0,
            erases: 0,
            protection_toggles: 0,
            nor_violations: 0,
            write_log: Vec::new(),
        }
    }

    pub fn fail_reads(&mut self) { self.fail_reads = true; }
    pub fn fail_writes(&mut self) { self.fail_writes = true; }
    pub fn fail_erases(&mut self) { self.fail_erases = true; }

    /// Clears every injected failure.
    pub fn heal(&mut self) {
        self.fail_reads = false;
        self.fail_writes = false;
        self.fail_erases = false;
    }

    pub fn is_write_protected(&self) -> bool { self.protected }

    /// Raw view into the flash contents.
    pub fn bytes(&self, address: u32, length: usize) -> &[u8] {
        &self.data[address as usize..address as usize + length]
    }

    /// Overwrites flash contents directly, bypassing protection and NOR rules.
    /// Stands in for anything written before the application runs.
    pub fn preload(&mut self, address: u32, bytes: &[u8]) {
        self.data[address as usize..address as usize + bytes.len()].copy_from_slice(bytes);
    }

    fn check_bounds(&self, address: u32, length: usize) -> nb::Result<(), FakeError> {
        if fits(address as usize, length, self.data.len()) {
            Ok(())
        } else {
            Err(nb::Error::Other(FakeError::OutOfBounds))
        }
    }

    fn check_writable(&self) -> nb::Result<(), FakeError> {
        if self.protected {
            Err(nb::Error::Other(FakeError::WriteProtected))
        } else {
            Ok(())
        }
    }
}

impl flash::Read for FakeFlash {
    type Error = FakeError;

    fn read(&mut self, address: u32, bytes: &mut [u8]) -> nb::Result<(), Self::Error> {
        if self.fail_reads {
            return Err(nb::Error::Other(FakeError::Injected));
        }
        self.check_bounds(address, bytes.len())?;
        bytes.copy_from_slice(self.bytes(address, bytes.len()));
        Ok(())
    }

    fn size(&self) -> usize { self.data.len() }
}

impl flash::Write for FakeFlash {
    fn write(&mut self, address: u32, bytes: &[u8]) -> nb::Result<(), Self::Error> {
        if self.fail_writes {
            return Err(nb::Error::Other(FakeError::Injected));
        }
        self.check_writable()?;
        self.check_bounds(address, bytes.len())?;
        let start = address as usize;
        for (cell, byte) in self.data[start..start + bytes.len()].iter_mut().zip(bytes) {
            if !(*byte).is_subset_of(*cell) {
                self.nor_violations += 1;
            }
            *cell = program(*cell, *byte);
        }
        self.writes += 1;
        self.write_log.push((address, bytes.to_vec()));
        Ok(())
    }
}

impl flash::Erase for FakeFlash {
    fn erase(&mut self, address: u32, size: usize) -> nb::Result<(), Self::Error> {
        if self.fail_erases {
            return Err(nb::Error::Other(FakeError::Injected));
        }
        self.check_writable()?;
        self.check_bounds(address, size)?;
        if address as usize % self.erase_size != 0 || size % self.erase_size != 0 {
            return Err(nb::Error::Other(FakeError::MisalignedAccess));
        }
        let start = address as usize;
        self.data[start..start + size].iter_mut().for_each(|b| *b = ERASED_BYTE);
        self.erases += 1;
        Ok(())
    }

    fn erase_size(&self) -> usize { self.erase_size }
}

impl flash::WriteProtect for FakeFlash {
    fn set_write_protection(&mut self, enabled: bool) -> nb::Result<(), Self::Error> {
        self.protection_toggles += 1;
        self.protected = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::flash::{Erase, Read, Write, WriteProtect};

    #[test]
    fn writes_only_clear_bits() {
        // Given
        let mut flash = FakeFlash::new(64, 16);
        flash.set_write_protection(false).unwrap();

        // When
        flash.write(4, &[0x0F, 0x01]).unwrap();
        flash.write(4, &[0xF0, 0x01]).unwrap();

        // Then
        assert_eq!(flash.bytes(4, 2), &[0x00, 0x01]);
        assert_eq!(flash.nor_violations, 1);
    }

    #[test]
    fn protection_blocks_mutation() {
        let mut flash = FakeFlash::new(64, 16);
        assert_eq!(flash.write(0, &[0x00]), Err(nb::Error::Other(FakeError::WriteProtected)));
        assert_eq!(flash.erase(0, 16), Err(nb::Error::Other(FakeError::WriteProtected)));
    }

    #[test]
    fn erase_restores_whole_blocks() {
        // Given
        let mut flash = FakeFlash::new(64, 16);
        flash.set_write_protection(false).unwrap();
        flash.write(16, &[0u8; 32]).unwrap();

        // When
        flash.erase(16, 16).unwrap();

        // Then
        assert!(flash.bytes(16, 16).iter().all(|b| *b == ERASED_BYTE));
        assert!(flash.bytes(32, 16).iter().all(|b| *b == 0));
        assert_eq!(flash.erase(8, 16), Err(nb::Error::Other(FakeError::MisalignedAccess)));
    }

    #[test]
    fn out_of_bounds_and_injected_failures() {
        let mut flash = FakeFlash::new(64, 16);
        let mut buffer = [0u8; 8];
        assert_eq!(flash.read(60, &mut buffer), Err(nb::Error::Other(FakeError::OutOfBounds)));

        flash.fail_reads();
        assert_eq!(flash.read(0, &mut buffer), Err(nb::Error::Other(FakeError::Injected)));
        flash.heal();
        assert!(flash.read(0, &mut buffer).is_ok());
    }
}
