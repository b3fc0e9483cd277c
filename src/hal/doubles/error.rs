use crate::error::{Convertible, Error};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FakeError {
    /// Injected failure
    Injected,
    OutOfBounds,
    WriteProtected,
    MisalignedAccess,
}

impl Convertible for FakeError {
    fn into(self) -> Error {
        Error::DeviceError(match self {
            FakeError::Injected => "A fake error occurred [TESTING ONLY]",
            FakeError::OutOfBounds => "Fake flash access out of bounds [TESTING ONLY]",
            FakeError::WriteProtected => "Fake flash is write protected [TESTING ONLY]",
            FakeError::MisalignedAccess => "Fake flash erase misaligned [TESTING ONLY]",
        })
    }
}
