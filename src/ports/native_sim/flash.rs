//! File backed NOR flash.
//!
//! Emulates the flash device of the board on top of a regular file, so boot
//! trailers survive restarts of the host binary. The file is created fully
//! erased. Writes follow NOR rules (bits can only be cleared) and both writes
//! and erases are rejected while write protection is enabled.

use crate::{
    configuration,
    error::{self, Error},
    hal::flash,
    utilities::{
        bitwise::{program, ERASED_BYTE},
        memory::{covering_blocks, fits},
    },
};
use log::{error, info};
use std::{
    fs::{File, OpenOptions},
    io::{self, Read as _, Seek, SeekFrom, Write as _},
    path::Path,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlashError {
    OutOfBounds,
    WriteProtected,
    Io(io::ErrorKind),
}

impl From<io::Error> for FlashError {
    fn from(e: io::Error) -> Self { FlashError::Io(e.kind()) }
}

impl error::Convertible for FlashError {
    fn into(self) -> Error {
        match self {
            FlashError::OutOfBounds => Error::DriverError("Flash access out of bounds"),
            FlashError::WriteProtected => Error::DriverError("Flash is write protected"),
            FlashError::Io(_) => Error::DriverError("Flash backing file I/O failed"),
        }
    }
}

/// Resolves the flash device named `name`, backed by the file at `path`.
///
/// Only the device named in the board configuration exists; any other name
/// fails with [`Error::DeviceNotFound`], as does a backing file that can't be
/// opened.
pub fn bind<P: AsRef<Path>>(name: &'static str, path: P) -> Result<FileFlash, Error> {
    if name != configuration::FLASH_DRIVER_NAME {
        error!("No flash device named `{}`", name);
        return Err(Error::DeviceNotFound(name));
    }
    let path = path.as_ref();
    let flash = FileFlash::open(path, configuration::FLASH_SIZE, configuration::ERASE_SIZE)
        .map_err(|e| {
            error!("Failed to open `{}` for flash `{}`: {:?}", path.display(), name, e);
            Error::DeviceNotFound(name)
        })?;
    info!("Bound flash `{}` to `{}`", name, path.display());
    Ok(flash)
}

#[derive(Debug)]
pub struct FileFlash {
    file: File,
    size: usize,
    erase_size: usize,
    protected: bool,
}

impl FileFlash {
    /// Opens (or creates, erased) a flash image of `size` bytes. An existing,
    /// shorter file is extended with erased bytes. Starts write protected.
    pub fn open<P: AsRef<Path>>(path: P, size: usize, erase_size: usize) -> Result<Self, FlashError> {
        let mut file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        let length = file.metadata()?.len() as usize;
        if length < size {
            file.seek(SeekFrom::Start(length as u64))?;
            file.write_all(&vec![ERASED_BYTE; size - length])?;
            file.flush()?;
        }
        Ok(Self { file, size, erase_size, protected: true })
    }

    pub fn is_write_protected(&self) -> bool { self.protected }

    fn check_bounds(&self, address: u32, length: usize) -> Result<(), FlashError> {
        if fits(address as usize, length, self.size) {
            Ok(())
        } else {
            Err(FlashError::OutOfBounds)
        }
    }

    fn check_writable(&self) -> Result<(), FlashError> {
        if self.protected {
            Err(FlashError::WriteProtected)
        } else {
            Ok(())
        }
    }

    fn read_at(&mut self, address: usize, bytes: &mut [u8]) -> Result<(), FlashError> {
        self.file.seek(SeekFrom::Start(address as u64))?;
        self.file.read_exact(bytes)?;
        Ok(())
    }

    fn write_at(&mut self, address: usize, bytes: &[u8]) -> Result<(), FlashError> {
        self.file.seek(SeekFrom::Start(address as u64))?;
        self.file.write_all(bytes)?;
        self.file.flush()?;
        Ok(())
    }
}

impl flash::Read for FileFlash {
    type Error = FlashError;

    fn read(&mut self, address: u32, bytes: &mut [u8]) -> nb::Result<(), Self::Error> {
        self.check_bounds(address, bytes.len())?;
        Ok(self.read_at(address as usize, bytes)?)
    }

    fn size(&self) -> usize { self.size }
}

impl flash::Write for FileFlash {
    fn write(&mut self, address: u32, bytes: &[u8]) -> nb::Result<(), Self::Error> {
        self.check_writable()?;
        self.check_bounds(address, bytes.len())?;
        let mut cells = vec![0u8; bytes.len()];
        self.read_at(address as usize, &mut cells)?;
        cells.iter_mut().zip(bytes).for_each(|(cell, byte)| *cell = program(*cell, *byte));
        Ok(self.write_at(address as usize, &cells)?)
    }
}

impl flash::Erase for FileFlash {
    fn erase(&mut self, address: u32, size: usize) -> nb::Result<(), Self::Error> {
        self.check_writable()?;
        self.check_bounds(address, size)?;
        let (start, length) = covering_blocks(address as usize, size, self.erase_size);
        if !fits(start, length, self.size) {
            return Err(nb::Error::Other(FlashError::OutOfBounds));
        }
        Ok(self.write_at(start, &vec![ERASED_BYTE; length])?)
    }

    fn erase_size(&self) -> usize { self.erase_size }
}

impl flash::WriteProtect for FileFlash {
    fn set_write_protection(&mut self, enabled: bool) -> nb::Result<(), Self::Error> {
        self.protected = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::flash::{Erase, Read, Write, WriteProtect};
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    /// Fresh directory holding a not yet created flash image.
    fn scratch() -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meshlight_flash.bin");
        (dir, path)
    }

    #[test]
    fn binding_an_unknown_device_fails_fast() {
        let (_dir, path) = scratch();
        assert_eq!(
            bind("NOT_A_FLASH", &path).unwrap_err(),
            Error::DeviceNotFound("NOT_A_FLASH")
        );
        assert!(!path.exists());
    }

    #[test]
    fn binding_the_configured_device_creates_an_erased_image() {
        // Given
        let (_dir, path) = scratch();

        // When
        let mut flash = bind(configuration::FLASH_DRIVER_NAME, &path).unwrap();

        // Then
        let mut bytes = [0u8; 16];
        flash.read(0, &mut bytes).unwrap();
        assert_eq!(bytes, [ERASED_BYTE; 16]);
        assert_eq!(flash.size(), configuration::FLASH_SIZE);
        assert!(flash.is_write_protected());
    }

    #[test]
    fn contents_survive_reopening() {
        // Given
        let (_dir, path) = scratch();
        let mut flash = FileFlash::open(&path, 0x2000, 0x1000).unwrap();
        flash.set_write_protection(false).unwrap();
        flash.write(0x10, &[0x01, 0xF0]).unwrap();
        drop(flash);

        // When
        let mut reopened = FileFlash::open(&path, 0x2000, 0x1000).unwrap();

        // Then
        let mut bytes = [0u8; 3];
        reopened.read(0x10, &mut bytes).unwrap();
        assert_eq!(bytes, [0x01, 0xF0, 0xFF]);
    }

    #[test]
    fn writes_follow_nor_rules_and_erase_restores_blocks() {
        // Given
        let (_dir, path) = scratch();
        let mut flash = FileFlash::open(&path, 0x2000, 0x1000).unwrap();
        flash.set_write_protection(false).unwrap();

        // When
        flash.write(0x1004, &[0x0F]).unwrap();
        flash.write(0x1004, &[0xF1]).unwrap();

        // Then
        let mut byte = [0u8];
        flash.read(0x1004, &mut byte).unwrap();
        assert_eq!(byte, [0x01]);

        // When
        flash.erase(0x1004, 1).unwrap();

        // Then
        flash.read(0x1004, &mut byte).unwrap();
        assert_eq!(byte, [0xFF]);
    }

    #[test]
    fn protection_and_bounds_are_enforced() {
        let (_dir, path) = scratch();
        let mut flash = FileFlash::open(&path, 0x1000, 0x1000).unwrap();
        assert_eq!(flash.write(0, &[0]), Err(nb::Error::Other(FlashError::WriteProtected)));
        assert_eq!(flash.erase(0, 0x1000), Err(nb::Error::Other(FlashError::WriteProtected)));
        let mut bytes = [0u8; 8];
        assert_eq!(flash.read(0xFFC, &mut bytes), Err(nb::Error::Other(FlashError::OutOfBounds)));
    }
}
