//! This meshlight sub-crate contains all definitions to help generate
//! the board configuration constants of the meshlight runtime.
//!
//! NOTE: This code is not included anywhere from meshlight itself! This
//! is a dependency of the meshlight **build script**. The build script
//! uses this dependency to validate a RON configuration file and to
//! generate the code that meshlight includes (flash geometry, application
//! tunables, log level).

use anyhow::{anyhow, Result};
use application::ApplicationConfiguration;
use memory::MemoryConfiguration;
use serde::{Deserialize, Serialize};

pub mod application;
pub mod codegen;
pub mod memory;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Configuration {
    pub memory_configuration: MemoryConfiguration,
    pub application_configuration: ApplicationConfiguration,
}

impl Configuration {
    pub fn new(
        memory_configuration: MemoryConfiguration,
        application_configuration: ApplicationConfiguration,
    ) -> Self {
        Self { memory_configuration, application_configuration }
    }

    /// Checks the configuration for every rule the runtime relies on, returning
    /// the first violation found.
    pub fn validate(&self) -> Result<()> {
        self.memory_configuration.validate()?;
        self.application_configuration.validate()?;
        Ok(())
    }

    pub fn complete(&self) -> bool { self.required_configuration_steps().next().is_none() }

    pub fn required_configuration_steps(&self) -> impl Iterator<Item = RequiredConfigurationStep> {
        let memory = &self.memory_configuration;
        #[rustfmt::skip]
        let steps = [
            memory.flash.name.is_empty().then_some(RequiredConfigurationStep::FlashDriverName),
            (memory.banks.len() != memory::BANK_COUNT).then_some(RequiredConfigurationStep::Banks),
        ];
        steps.into_iter().flatten()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequiredConfigurationStep {
    FlashDriverName,
    Banks,
}

impl std::fmt::Display for RequiredConfigurationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RequiredConfigurationStep::FlashDriverName => "[Memory Map] Name the flash device",
            RequiredConfigurationStep::Banks => "[Memory Map] Define exactly two image banks",
        })
    }
}

/// Parses a log level name as accepted by the configuration file.
pub fn parse_log_level(level: &str) -> Result<&'static str> {
    match level {
        "off" => Ok("Off"),
        "error" => Ok("Error"),
        "warn" => Ok("Warn"),
        "info" => Ok("Info"),
        "debug" => Ok("Debug"),
        "trace" => Ok("Trace"),
        other => Err(anyhow!("Unknown log level `{}`", other)),
    }
}
