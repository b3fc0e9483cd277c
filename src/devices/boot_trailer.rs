//! Image confirmation and update staging.
//!
//! The [`TrailerManager`] reads and advances the boot trailer at the tail of
//! each bank. It never rewrites the magic sentinel and never relies on setting
//! bits without an erase: a status byte either moves from the erased value to
//! its marker, or the bank has to be erased first.
//!
//! Every mutation happens inside a write protection bracket that is closed on
//! every exit path. Flash failures are returned as they happen; there is no
//! retry at this level.

use super::{
    bank::{Bank, MemoryMap},
    traits::Flash,
    trailer::{
        ImageStatus, StatusField, TrailerRecord, COPY_DONE_OFFSET, IMAGE_OK_DONE,
        IMAGE_OK_OFFSET, TRAILER_SIZE,
    },
};
use crate::{error::Error, utilities::bitwise::ERASED_BYTE, utilities::guard::Guard};
use log::{debug, error, info, warn};

pub struct TrailerManager<F: Flash> {
    flash: F,
    memory_map: MemoryMap,
}

impl<F: Flash> TrailerManager<F> {
    pub fn new(flash: F, memory_map: MemoryMap) -> Self { Self { flash, memory_map } }

    pub fn memory_map(&self) -> MemoryMap { self.memory_map }

    pub fn flash(&self) -> &F { &self.flash }

    /// Hands the flash device back, e.g. to rebuild a manager after a reset.
    pub fn release(self) -> F { self.flash }

    /// Reads the `image_ok` status of a bank. Anything but the confirmed
    /// marker reads as [`ImageStatus::Ongoing`].
    pub fn read_image_status(&mut self, bank: Bank) -> Result<ImageStatus, Error> {
        let status = ImageStatus::decode(self.read_status(bank, IMAGE_OK_OFFSET)?);
        debug!("Bank {} image status: {:?}", bank.index, status);
        Ok(status)
    }

    /// Reads and decodes the whole trailer of a bank.
    pub fn read_trailer(&mut self, bank: Bank) -> Result<TrailerRecord, Error> {
        let mut bytes = [0u8; TRAILER_SIZE];
        let trailer = self.trailer_of(bank)?;
        nb::block!(self.flash.read(trailer, &mut bytes))
            .map_err(|e| self.report_failure("read", bank, e))?;
        Ok(TrailerRecord::from_bytes(&bytes))
    }

    /// Marks the image in the running bank as good, so the bootloader keeps
    /// it instead of reverting. Confirming an already confirmed image does
    /// nothing.
    pub fn confirm_image(&mut self, bank: Bank) -> Result<(), Error> {
        if !bank.is_running() {
            error!("Refusing to confirm bank {}: it is not the running bank", bank.index);
            return Err(Error::BankInvalid);
        }

        match self.read_status(bank, IMAGE_OK_OFFSET)? {
            IMAGE_OK_DONE => {
                debug!("Image in bank {} already confirmed", bank.index);
                Ok(())
            }
            ERASED_BYTE => {
                let address = self.trailer_of(bank)? + IMAGE_OK_OFFSET as u32;
                self.write_field(bank, address, StatusField::new(IMAGE_OK_DONE))?;
                info!("Confirmed image in bank {}", bank.index);
                Ok(())
            }
            other => {
                // Programming the marker over cleared bits can't produce it.
                error!("Bank {} image_ok holds unrecognized status {:#04x}", bank.index, other);
                Err(Error::TrailerCorrupted)
            }
        }
    }

    /// Resets both status fields of a bank's trailer to the erased pattern,
    /// flagging the bank to the bootloader as a fresh candidate. This is the
    /// final commit after the image payload has been written.
    ///
    /// Writes can only clear bits, so the fields only read back erased if the
    /// bank was erased beforehand. The trailer is read back and
    /// [`Error::TrailerNotErased`] returned when it isn't.
    pub fn trigger_update(&mut self, bank: Bank) -> Result<(), Error> {
        let trailer = self.trailer_of(bank)?;
        self.write_field(bank, trailer + COPY_DONE_OFFSET as u32, StatusField::erased())?;
        self.write_field(bank, trailer + IMAGE_OK_OFFSET as u32, StatusField::erased())?;

        let record = self.read_trailer(bank)?;
        if !record.is_pending_candidate() {
            warn!(
                "Bank {} trailer did not clear (copy_done {:?}, image_ok {:#04x}); erase it first",
                bank.index, record.copy_done, record.image_ok_raw
            );
            return Err(Error::TrailerNotErased);
        }
        info!("Update staged in bank {}", bank.index);
        Ok(())
    }

    /// Erases a whole bank, trailer included.
    pub fn erase_bank(&mut self, bank: Bank) -> Result<(), Error> {
        self.trailer_of(bank)?;
        info!("Erasing bank {} ({} bytes at {:#010x})", bank.index, bank.size, bank.location);
        self.unprotected(bank, "erase", |flash| flash.erase(bank.location, bank.size))
    }

    /// Programs image payload into a bank, starting `offset` bytes into it.
    /// The trailer region is off limits.
    pub fn write_image(&mut self, bank: Bank, offset: usize, bytes: &[u8]) -> Result<(), Error> {
        self.trailer_of(bank)?;
        let payload_size = bank.payload_size();
        if offset.checked_add(bytes.len()).map_or(true, |end| end > payload_size) {
            return Err(Error::DeviceError("Image does not fit in bank"));
        }
        let address = bank.location + offset as u32;
        self.unprotected(bank, "write", |flash| flash.write(address, bytes))
    }

    fn read_status(&mut self, bank: Bank, field_offset: usize) -> Result<u8, Error> {
        let mut byte = [0u8; 1];
        let address = self.trailer_of(bank)? + field_offset as u32;
        nb::block!(self.flash.read(address, &mut byte))
            .map_err(|e| self.report_failure("read", bank, e))?;
        Ok(byte[0])
    }

    fn write_field(&mut self, bank: Bank, address: u32, field: StatusField) -> Result<(), Error> {
        debug!("Writing status {:#04x} at {:#010x}", field.status(), address);
        self.unprotected(bank, "write", |flash| flash.write(address, field.as_bytes()))
    }

    /// Runs a single flash mutation with write protection lifted. Protection
    /// is restored when the bracket closes, whatever the outcome.
    fn unprotected<O>(&mut self, bank: Bank, operation: &str, mut mutation: O) -> Result<(), Error>
    where
        O: FnMut(&mut F) -> nb::Result<(), F::Error>,
    {
        let result = Guard::try_new(
            &mut self.flash,
            |f: &mut F| nb::block!(f.set_write_protection(false)),
            |f: &mut F| {
                if nb::block!(f.set_write_protection(true)).is_err() {
                    error!("Failed to restore flash write protection");
                }
            },
        )
        .and_then(|mut flash| nb::block!(mutation(&mut *flash)));
        result.map_err(|e| self.report_failure(operation, bank, e))
    }

    /// Trailer offset of `bank`, which must belong to this manager's memory map.
    fn trailer_of(&self, bank: Bank) -> Result<u32, Error> {
        match self.memory_map.bank(bank.index) {
            Ok(known) if known == bank => Ok(bank.trailer_location()),
            _ => {
                error!("Bank {} at {:#010x} is not part of the memory map", bank.index, bank.location);
                Err(Error::BankInvalid)
            }
        }
    }

    fn report_failure(&self, operation: &str, bank: Bank, e: F::Error) -> Error {
        error!("Flash {} on bank {} failed: {:?}", operation, bank.index, e);
        e.into()
    }
}
