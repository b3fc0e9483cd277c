//! Uptime stamped logging to standard output.
//!
//! Every record is prefixed with the milliseconds elapsed since the logger was
//! installed, zero padded to seven digits: `[0001234] INFO  meshlight: ...`.

use super::clock::SystemClock;
use crate::{error::Error, hal::time::Now};
use log::{LevelFilter, Log, Metadata, Record};
use std::{
    boxed::Box,
    io::{self, Write},
    string::String,
};

pub struct UptimeLogger {
    clock: SystemClock,
    level: LevelFilter,
}

impl UptimeLogger {
    pub fn new(level: LevelFilter) -> Self { Self { clock: SystemClock::new(), level } }

    /// Installs the logger for the whole process. Fails if a logger is
    /// already installed.
    pub fn install(level: LevelFilter) -> Result<(), Error> {
        log::set_boxed_logger(Box::new(Self::new(level)))
            .map_err(|_| Error::ConfigurationError("A logger is already installed"))?;
        log::set_max_level(level);
        Ok(())
    }

    pub fn format(&self, record: &Record) -> String {
        format!(
            "[{:07}] {:<5} {}: {}",
            self.clock.now().0,
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for UptimeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool { metadata.level() <= self.level }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(io::stdout().lock(), "{}", self.format(record));
        }
    }

    fn flush(&self) { let _ = io::stdout().flush(); }
}

#[cfg(test)]
mod test {
    use super::*;
    use log::Level;

    #[test]
    fn records_are_stamped_with_padded_uptime() {
        // Given
        let logger = UptimeLogger::new(LevelFilter::Info);

        // When
        let line = logger.format(
            &Record::builder()
                .args(format_args!("Confirmed image in bank {}", 0))
                .level(Level::Info)
                .target("meshlight_lib::devices::boot_trailer")
                .build(),
        );

        // Then
        assert!(line.starts_with("[000"));
        assert_eq!(&line[9..], " INFO  meshlight_lib::devices::boot_trailer: Confirmed image in bank 0");
    }

    #[test]
    fn records_above_the_level_are_filtered() {
        let logger = UptimeLogger::new(LevelFilter::Info);
        let debug = Metadata::builder().level(Level::Debug).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&warn));
    }
}
