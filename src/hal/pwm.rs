//! Pulse width modulation interface.
use crate::hal::time::Microseconds;

/// A single PWM output channel.
pub trait Pwm {
    type Error: Clone + Copy + core::fmt::Debug;
    /// Drives the channel with the given period, keeping it high for `pulse`.
    fn set_pulse(&mut self, period: Microseconds, pulse: Microseconds) -> Result<(), Self::Error>;
}
