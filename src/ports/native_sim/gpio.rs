//! Output pins that report their level through the log.
use crate::hal::gpio::OutputPin;
use log::info;

#[derive(Debug)]
pub struct LoggingPin {
    name: &'static str,
    high: bool,
}

impl LoggingPin {
    /// A pin starting low.
    pub fn new(name: &'static str) -> Self { Self { name, high: false } }

    pub fn is_high(&self) -> bool { self.high }
}

impl OutputPin for LoggingPin {
    fn set_low(&mut self) {
        self.high = false;
        info!("{} off", self.name);
    }

    fn set_high(&mut self) {
        self.high = true;
        info!("{} on", self.name);
    }
}
