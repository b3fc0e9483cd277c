//! Standard output as a `ufmt` console, used to report fatal errors.
use std::io::{self, Write};
use ufmt::uWrite;

#[derive(Clone, Copy, Debug, Default)]
pub struct Console;

impl uWrite for Console {
    type Error = io::ErrorKind;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(s.as_bytes()).and_then(|_| stdout.flush()).map_err(|e| e.kind())
    }
}
