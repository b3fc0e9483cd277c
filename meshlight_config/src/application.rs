use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::parse_log_level;

/// Longest hardware unique id among supported SoCs, in 32-bit words.
pub const MAX_DEVICE_ID_WORDS: usize = 4;

/// Tunables of the smart light application that sits on top of the work queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfiguration {
    /// Board name reported in the product identity.
    pub board: String,
    /// Hardware unique id words the serial number is hashed from.
    pub device_id: Vec<u32>,
    /// Default TTL of the configuration server; also used to derive the blink delay
    /// from the TTL of received Generic OnOff messages.
    pub default_ttl: u8,
    /// Period of the visual feedback blink once provisioning completes.
    pub provisioning_blink_ms: u32,
    /// Upper bound applied to the white PWM channel (0-255).
    pub pwm_white_ceiling: u8,
    pub log_level: String,
}

impl Default for ApplicationConfiguration {
    fn default() -> Self {
        Self {
            board: "native_sim".into(),
            device_id: vec![0x1234_5678, 0x9ABC_DEF0],
            default_ttl: 5,
            provisioning_blink_ms: 1000,
            pwm_white_ceiling: 255,
            log_level: "info".into(),
        }
    }
}

impl ApplicationConfiguration {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.board.is_empty(), "Board name must not be empty");
        ensure!(
            (1..=MAX_DEVICE_ID_WORDS).contains(&self.device_id.len()),
            "Device id must hold between 1 and {} words",
            MAX_DEVICE_ID_WORDS
        );
        ensure!(self.default_ttl <= 127, "Mesh TTL must be at most 127");
        ensure!(self.provisioning_blink_ms > 0, "Provisioning blink period must be non-zero");
        parse_log_level(&self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() { ApplicationConfiguration::default().validate().unwrap(); }

    #[test]
    fn bad_log_level_is_rejected() {
        let configuration =
            ApplicationConfiguration { log_level: "loud".into(), ..Default::default() };
        assert!(configuration.validate().is_err());
    }

    #[test]
    fn zero_blink_period_is_rejected() {
        let configuration =
            ApplicationConfiguration { provisioning_blink_ms: 0, ..Default::default() };
        assert!(configuration.validate().is_err());
    }

    #[test]
    fn device_id_length_is_bounded() {
        let empty = ApplicationConfiguration { device_id: vec![], ..Default::default() };
        let long = ApplicationConfiguration { device_id: vec![0; 5], ..Default::default() };
        assert!(empty.validate().is_err());
        assert!(long.validate().is_err());
    }
}
