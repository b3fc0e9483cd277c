//! Boot trailer record.
//!
//! Every bank ends with a 32 byte trailer shared with the bootloader. Its
//! layout is fixed and bit exact:
//!
//! ```text
//! offset  size  field
//!      0     1  copy_done status
//!      1     7  pad (0xFF)
//!      8     1  image_ok status
//!      9     7  pad (0xFF)
//!     16    16  magic
//! ```
//!
//! Status bytes read `0xFF` while erased. Programming one to its marker only
//! clears bits, so each field moves forward exactly once per erase cycle.
//! The record is (de)serialized explicitly, field by field, so the in-memory
//! layout of these types never leaks onto flash.

use crate::utilities::bitwise::{is_erased, ERASED_BYTE};
use static_assertions::const_assert_eq;

pub const PAD_SIZE: usize = 7;
pub const PAD_VALUE: u8 = ERASED_BYTE;
pub const MAGIC_SIZE: usize = 16;
/// Status byte plus its padding.
pub const FIELD_SIZE: usize = 1 + PAD_SIZE;
pub const TRAILER_SIZE: usize = 2 * FIELD_SIZE + MAGIC_SIZE;

pub const COPY_DONE_OFFSET: usize = 0;
pub const IMAGE_OK_OFFSET: usize = COPY_DONE_OFFSET + FIELD_SIZE;
pub const MAGIC_OFFSET: usize = IMAGE_OK_OFFSET + FIELD_SIZE;

/// `image_ok` marker of a confirmed image.
pub const IMAGE_OK_DONE: u8 = 0x01;
/// `copy_done` marker written by the bootloader once an image is copied in.
pub const COPY_DONE_SET: u8 = 0x01;

const_assert_eq!(TRAILER_SIZE, 32);
const_assert_eq!(IMAGE_OK_OFFSET, 8);
const_assert_eq!(MAGIC_OFFSET, 16);

/// Confirmation state of the image in a bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageStatus {
    /// The image has been confirmed good.
    Done,
    /// The image still awaits confirmation. Anything other than the
    /// [`IMAGE_OK_DONE`] marker reads as this.
    Ongoing,
}

impl ImageStatus {
    pub fn decode(byte: u8) -> Self {
        if byte == IMAGE_OK_DONE {
            ImageStatus::Done
        } else {
            ImageStatus::Ongoing
        }
    }

    /// Status byte for this state. `Ongoing` is the erased value.
    pub fn encode(self) -> u8 {
        match self {
            ImageStatus::Done => IMAGE_OK_DONE,
            ImageStatus::Ongoing => ERASED_BYTE,
        }
    }
}

/// State of the `copy_done` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyDone {
    Erased,
    Set,
    Unrecognized(u8),
}

impl CopyDone {
    pub fn decode(byte: u8) -> Self {
        match byte {
            ERASED_BYTE => CopyDone::Erased,
            COPY_DONE_SET => CopyDone::Set,
            other => CopyDone::Unrecognized(other),
        }
    }

    pub fn encode(self) -> u8 {
        match self {
            CopyDone::Erased => ERASED_BYTE,
            CopyDone::Set => COPY_DONE_SET,
            CopyDone::Unrecognized(byte) => byte,
        }
    }
}

/// A status byte followed by its pad bytes, as it sits on flash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusField([u8; FIELD_SIZE]);

impl StatusField {
    /// Field holding `status`, padded with [`PAD_VALUE`].
    pub fn new(status: u8) -> Self {
        let mut bytes = [PAD_VALUE; FIELD_SIZE];
        bytes[0] = status;
        Self(bytes)
    }

    /// Fully erased field.
    pub fn erased() -> Self { Self([ERASED_BYTE; FIELD_SIZE]) }

    pub fn status(&self) -> u8 { self.0[0] }

    pub fn is_erased(&self) -> bool { is_erased(&self.0) }

    pub fn as_bytes(&self) -> &[u8; FIELD_SIZE] { &self.0 }
}

/// Decoded boot trailer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrailerRecord {
    pub copy_done: CopyDone,
    pub image_ok: ImageStatus,
    /// Raw `image_ok` status byte, kept to tell erased from unrecognized values.
    pub image_ok_raw: u8,
    /// Bootloader sentinel. Never rewritten by the application.
    pub magic: [u8; MAGIC_SIZE],
}

impl TrailerRecord {
    pub fn from_bytes(bytes: &[u8; TRAILER_SIZE]) -> Self {
        let mut magic = [0u8; MAGIC_SIZE];
        magic.copy_from_slice(&bytes[MAGIC_OFFSET..MAGIC_OFFSET + MAGIC_SIZE]);
        let image_ok_raw = bytes[IMAGE_OK_OFFSET];
        Self {
            copy_done: CopyDone::decode(bytes[COPY_DONE_OFFSET]),
            image_ok: ImageStatus::decode(image_ok_raw),
            image_ok_raw,
            magic,
        }
    }

    pub fn to_bytes(&self) -> [u8; TRAILER_SIZE] {
        let mut bytes = [PAD_VALUE; TRAILER_SIZE];
        bytes[COPY_DONE_OFFSET..COPY_DONE_OFFSET + FIELD_SIZE]
            .copy_from_slice(StatusField::new(self.copy_done.encode()).as_bytes());
        bytes[IMAGE_OK_OFFSET..IMAGE_OK_OFFSET + FIELD_SIZE]
            .copy_from_slice(StatusField::new(self.image_ok_raw).as_bytes());
        bytes[MAGIC_OFFSET..MAGIC_OFFSET + MAGIC_SIZE].copy_from_slice(&self.magic);
        bytes
    }

    /// Whether both status fields read as freshly erased: a candidate the
    /// bootloader has not yet touched.
    pub fn is_pending_candidate(&self) -> bool {
        self.copy_done == CopyDone::Erased && self.image_ok_raw == ERASED_BYTE
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn image_status_decoding_is_conservative() {
        assert_eq!(ImageStatus::decode(0x01), ImageStatus::Done);
        assert_eq!(ImageStatus::decode(0xFF), ImageStatus::Ongoing);
        assert_eq!(ImageStatus::decode(0x00), ImageStatus::Ongoing);
        assert_eq!(ImageStatus::decode(0x5A), ImageStatus::Ongoing);
    }

    #[test]
    fn copy_done_is_tri_state() {
        assert_eq!(CopyDone::decode(0xFF), CopyDone::Erased);
        assert_eq!(CopyDone::decode(0x01), CopyDone::Set);
        assert_eq!(CopyDone::decode(0x00), CopyDone::Unrecognized(0x00));
    }

    #[test]
    fn status_fields_are_padded_with_erased_bytes() {
        let field = StatusField::new(IMAGE_OK_DONE);
        assert_eq!(field.as_bytes(), &[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(!field.is_erased());
        assert!(StatusField::erased().is_erased());
        assert_eq!(StatusField::new(ImageStatus::Ongoing.encode()), StatusField::erased());
    }

    #[test]
    fn trailer_fields_land_at_fixed_offsets() {
        // Given
        let mut raw = [0xFFu8; TRAILER_SIZE];
        raw[0] = COPY_DONE_SET;
        raw[8] = IMAGE_OK_DONE;
        raw[16..].iter_mut().enumerate().for_each(|(i, b)| *b = i as u8);

        // When
        let record = TrailerRecord::from_bytes(&raw);

        // Then
        assert_eq!(record.copy_done, CopyDone::Set);
        assert_eq!(record.image_ok, ImageStatus::Done);
        assert_eq!(record.magic[15], 15);
        assert_eq!(record.to_bytes(), raw);
        assert!(!record.is_pending_candidate());
    }

    #[test]
    fn erased_trailer_is_a_pending_candidate() {
        let record = TrailerRecord::from_bytes(&[0xFF; TRAILER_SIZE]);
        assert_eq!(record.copy_done, CopyDone::Erased);
        assert_eq!(record.image_ok, ImageStatus::Ongoing);
        assert!(record.is_pending_candidate());
    }
}
