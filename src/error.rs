//! Error types and methods for the smart light runtime.

use ufmt::{uWrite, uwriteln};

/// Top level error type for the runtime. Unlike the specific driver
/// errors, this error contains textual descriptions of the problem
/// as it is meant to be directly reported through a console.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// Error caused by a low level peripheral driver
    DriverError(&'static str),
    /// Error caused by a faulty configuration
    ConfigurationError(&'static str),
    /// Error caused by a high level device driver
    DeviceError(&'static str),
    /// A device binding could not be resolved at startup
    DeviceNotFound(&'static str),
    BankInvalid,
    TrailerCorrupted,
    TrailerNotErased,
    QueueNotInitialized,
}

/// Implemented by driver errors that can be lifted into [`Error`].
pub trait Convertible {
    fn into(self) -> Error;
}

impl<T: Convertible> From<T> for Error {
    fn from(t: T) -> Self { t.into() }
}

/// Drivers that cannot fail.
impl Convertible for core::convert::Infallible {
    fn into(self) -> Error { match self {} }
}

/// Exposes a report_unwrap() method that behaves like
/// unwrap(), but also reports any errors via console before panicking.
pub trait ReportOnUnwrap<T, W: uWrite> {
    fn report_unwrap(self, console: &mut W) -> T;
}

impl<T, W: uWrite> ReportOnUnwrap<T, W> for Result<T, Error> {
    fn report_unwrap(self, console: &mut W) -> T {
        match self {
            Ok(value) => value,
            Err(error) => {
                error.report(console);
                panic!("{:?}", error);
            }
        }
    }
}

impl Error {
    /// Reports error via abstract console
    pub fn report<W: uWrite>(&self, console: &mut W) {
        let _ = match self {
            Error::DriverError(text) => uwriteln!(console, "[Driver Error] -> {}", text),
            Error::ConfigurationError(text) => {
                uwriteln!(console, "[Configuration Error] -> {}", text)
            }
            Error::DeviceError(text) => uwriteln!(console, "[Device Error] -> {}", text),
            Error::DeviceNotFound(name) => {
                uwriteln!(console, "[Device Error] -> Failed to find device `{}`", name)
            }
            Error::BankInvalid => uwriteln!(
                console,
                "[Logic Error] -> Bank doesn't exist or is invalid in this context"
            ),
            Error::TrailerCorrupted => uwriteln!(
                console,
                "[Logic Error] -> Boot trailer holds an unrecognized status, erase required"
            ),
            Error::TrailerNotErased => uwriteln!(
                console,
                "[Logic Error] -> Boot trailer could not be cleared, bank must be erased first"
            ),
            Error::QueueNotInitialized => {
                uwriteln!(console, "[Logic Error] -> Work queue used before initialization")
            }
        };
    }
}
