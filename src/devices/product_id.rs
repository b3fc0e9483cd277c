//! Product identity.
//!
//! Every node derives a 32-bit serial number from the hardware unique id of
//! its SoC. The serial seeds the Bluetooth Mesh device UUID advertised while
//! unprovisioned, and the static random address the node uses on air.

use crate::configuration;
use core::fmt;

const HASH_MULTIPLIER: u32 = 37;
/// Top two bytes of every derived address; the top bits mark it static random.
const ADDRESS_PREFIX: [u8; 2] = [0xE7, 0xD6];

/// Multiplicative string hash. Wraps on overflow.
pub fn hash32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |hash, byte| {
        hash.wrapping_mul(HASH_MULTIPLIER).wrapping_add(*byte as u32)
    })
}

/// Board name and serial number of this node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductId {
    pub name: &'static str,
    pub number: u32,
}

/// Static random Bluetooth LE address, least significant byte first as sent
/// on air.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BtAddress(pub [u8; 6]);

impl ProductId {
    /// Hashes the unique id words, formatted as consecutive eight digit
    /// lowercase hex groups.
    pub fn from_unique_id(name: &'static str, words: &[u32]) -> Self {
        let hex: String = words.iter().map(|word| format!("{:08x}", word)).collect();
        Self { name, number: hash32(hex.as_bytes()) }
    }

    /// Identity of the configured board.
    pub fn configured() -> Self {
        Self::from_unique_id(configuration::BOARD_NAME, configuration::DEVICE_ID)
    }

    /// Mesh device UUID: the serial number, little endian, zero padded.
    pub fn device_uuid(&self) -> [u8; 16] {
        let mut uuid = [0u8; 16];
        uuid[..4].copy_from_slice(&self.number.to_le_bytes());
        uuid
    }

    pub fn bt_address(&self) -> BtAddress {
        let mut address = [0u8; 6];
        address[..4].copy_from_slice(&self.number.to_le_bytes());
        address[4..].copy_from_slice(&ADDRESS_PREFIX);
        BtAddress(address)
    }
}

/// Conventional most significant byte first notation.
impl fmt::Display for BtAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", g, e, d, c, b, a)
    }
}
