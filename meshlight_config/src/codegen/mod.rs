//! Generation of the `configuration.rs` module included by the runtime.
use std::{fs::OpenOptions, io::Write, path::Path};

use anyhow::{anyhow, Result};
use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::quote;

use crate::{parse_log_level, Configuration, KB};

/// Validates the configuration and writes `configuration.rs` inside `out_dir`.
pub fn generate_modules<P: AsRef<Path>>(out_dir: P, configuration: &Configuration) -> Result<()> {
    configuration.validate()?;
    let tokens = configuration_tokens(configuration)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(out_dir.as_ref().join("configuration.rs"))?;
    writeln!(file, "{}", tokens)?;
    Ok(())
}

pub fn configuration_tokens(configuration: &Configuration) -> Result<TokenStream> {
    let memory = &configuration.memory_configuration;
    let application = &configuration.application_configuration;
    let flash = &memory.flash;

    let bank_size = memory.bank_size().ok_or_else(|| anyhow!("No banks defined"))?;
    // Banks are addressed relative to the start of the flash device.
    let bank_0_offset = Literal::u32_unsuffixed(KB!(memory.banks[0].offset_kb));
    let bank_1_offset = Literal::u32_unsuffixed(KB!(memory.banks[1].offset_kb));
    let bank_size = Literal::usize_unsuffixed(bank_size as usize);

    let flash_name = flash.name.as_str();
    let flash_start = Literal::u32_unsuffixed(flash.start_address());
    let flash_size = Literal::usize_unsuffixed(KB!(flash.size_kb) as usize);
    let erase_size = Literal::usize_unsuffixed(KB!(flash.erase_size_kb) as usize);

    let board = application.board.as_str();
    let device_id = application.device_id.iter().map(|word| Literal::u32_unsuffixed(*word));
    let default_ttl = Literal::u8_unsuffixed(application.default_ttl);
    let provisioning_blink_ms = Literal::u32_unsuffixed(application.provisioning_blink_ms);
    let pwm_white_ceiling = Literal::u8_unsuffixed(application.pwm_white_ceiling);
    let log_level = Ident::new(parse_log_level(&application.log_level)?, Span::call_site());

    Ok(quote! {
        /// Name the flash device is bound by at startup.
        pub const FLASH_DRIVER_NAME: &str = #flash_name;
        pub const FLASH_START: u32 = #flash_start;
        pub const FLASH_SIZE: usize = #flash_size;
        /// Smallest erasable region of the flash device.
        pub const ERASE_SIZE: usize = #erase_size;
        /// Both image banks share this size.
        pub const BANK_SIZE: usize = #bank_size;
        /// Offset into flash of the bank currently executing.
        pub const BANK_0_OFFSET: u32 = #bank_0_offset;
        /// Update staging bank.
        pub const BANK_1_OFFSET: u32 = #bank_1_offset;
        pub const BOARD_NAME: &str = #board;
        /// Hardware unique id of the SoC.
        pub const DEVICE_ID: &[u32] = &[#(#device_id),*];
        pub const DEFAULT_TTL: u8 = #default_ttl;
        pub const PROVISIONING_BLINK_MS: u32 = #provisioning_blink_ms;
        pub const PWM_WHITE_CEILING: u8 = #pwm_white_ceiling;
        pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::#log_level;
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        application::ApplicationConfiguration,
        memory::{Bank, FlashChip, MemoryConfiguration},
    };

    fn configuration() -> Configuration {
        Configuration::new(
            MemoryConfiguration {
                flash: FlashChip {
                    name: "TEST_FLASH".into(),
                    start_kb: 128,
                    size_kb: 256,
                    erase_size_kb: 4,
                },
                banks: vec![Bank { offset_kb: 32, size_kb: 64 }, Bank { offset_kb: 96, size_kb: 64 }],
            },
            ApplicationConfiguration { log_level: "debug".into(), ..Default::default() },
        )
    }

    #[test]
    fn generated_constants_reflect_memory_map() {
        // Given
        let configuration = configuration();

        // When
        let generated = configuration_tokens(&configuration).unwrap().to_string().replace(' ', "");

        // Then
        assert!(generated.contains("pubconstFLASH_DRIVER_NAME:&str=\"TEST_FLASH\";"));
        assert!(generated.contains("pubconstFLASH_START:u32=131072;"));
        assert!(generated.contains("pubconstBANK_SIZE:usize=65536;"));
        assert!(generated.contains("pubconstBANK_0_OFFSET:u32=32768;"));
        assert!(generated.contains("pubconstBANK_1_OFFSET:u32=98304;"));
        assert!(generated.contains("log::LevelFilter::Debug;"));
        assert!(generated.contains("pubconstBOARD_NAME:&str=\"native_sim\";"));
        assert!(generated.contains("pubconstDEVICE_ID:&[u32]=&[305419896,2596069104];"));
    }

    #[test]
    fn invalid_configuration_generates_nothing() {
        let mut configuration = configuration();
        configuration.memory_configuration.banks[1].size_kb = 60;
        let out_dir = tempfile::tempdir().unwrap();
        assert!(generate_modules(out_dir.path(), &configuration).is_err());
        assert!(!out_dir.path().join("configuration.rs").exists());
    }
}
