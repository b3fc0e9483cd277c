use anyhow::{anyhow, ensure, Result};
use serde::{Deserialize, Serialize};

#[macro_export(local_inner_macros)]
macro_rules! KB {
    ($val:expr) => {
        $val * 1024
    };
}

/// The runtime works with a running bank and a staging bank, nothing else.
pub const BANK_COUNT: usize = 2;

/// Size of the boot trailer at the tail of every bank. Banks must be able to hold
/// at least one erase block of image on top of it.
pub const TRAILER_SIZE: u32 = 32;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct FlashChip {
    /// Name the flash device is bound by at startup.
    pub name: String,
    pub start_kb: u32,
    pub size_kb: u32,
    /// Size of the smallest erasable region
    pub erase_size_kb: u32,
}

impl FlashChip {
    pub fn start_address(&self) -> u32 { KB!(self.start_kb) }
    pub fn end_address(&self) -> u32 { KB!(self.start_kb + self.size_kb) }
}

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bank {
    /// Offset from the start of the flash chip.
    pub offset_kb: u32,
    pub size_kb: u32,
}

impl Bank {
    pub fn start_address(&self, flash: &FlashChip) -> u32 {
        flash.start_address() + KB!(self.offset_kb)
    }

    pub fn end_address(&self, flash: &FlashChip) -> u32 {
        self.start_address(flash) + KB!(self.size_kb)
    }

    fn overlaps(&self, other: &Bank) -> bool {
        let (a_start, a_end) = (self.offset_kb, self.offset_kb + self.size_kb);
        let (b_start, b_end) = (other.offset_kb, other.offset_kb + other.size_kb);
        a_start < b_end && b_start < a_end
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfiguration {
    pub flash: FlashChip,
    pub banks: Vec<Bank>,
}

impl MemoryConfiguration {
    pub fn bank_size(&self) -> Option<u32> { self.banks.first().map(|b| KB!(b.size_kb)) }

    pub fn validate(&self) -> Result<()> {
        let flash = &self.flash;
        ensure!(!flash.name.is_empty(), "Flash device name must not be empty");
        ensure!(flash.erase_size_kb > 0, "Flash erase size must be non-zero");
        ensure!(
            self.banks.len() == BANK_COUNT,
            "Exactly {} banks are required, {} defined",
            BANK_COUNT,
            self.banks.len()
        );

        let (running, staging) = (&self.banks[0], &self.banks[1]);
        ensure!(
            running.size_kb == staging.size_kb,
            "Image banks must have equal size ({}KB != {}KB)",
            running.size_kb,
            staging.size_kb
        );
        ensure!(!running.overlaps(staging), "Image banks overlap");

        for (index, bank) in self.banks.iter().enumerate() {
            ensure!(
                KB!(bank.size_kb) > TRAILER_SIZE,
                "Bank {} is too small to hold a boot trailer",
                index
            );
            ensure!(
                bank.offset_kb % flash.erase_size_kb == 0 && bank.size_kb % flash.erase_size_kb == 0,
                "Bank {} is not aligned to {}KB erase blocks",
                index,
                flash.erase_size_kb
            );
            if bank.offset_kb + bank.size_kb > flash.size_kb {
                return Err(anyhow!("Bank {} lies outside the flash chip `{}`", index, flash.name));
            }
        }
        Ok(())
    }
}
