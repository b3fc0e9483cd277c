//! PWM channels that report their duty cycle through the log.
use crate::hal::{pwm::Pwm, time::Microseconds};
use core::convert::Infallible;
use log::info;

#[derive(Debug)]
pub struct LoggingPwm {
    name: &'static str,
    pulse: Microseconds,
}

impl LoggingPwm {
    pub fn new(name: &'static str) -> Self { Self { name, pulse: Microseconds(0) } }

    pub fn pulse(&self) -> Microseconds { self.pulse }
}

impl Pwm for LoggingPwm {
    type Error = Infallible;

    fn set_pulse(&mut self, period: Microseconds, pulse: Microseconds) -> Result<(), Infallible> {
        self.pulse = pulse;
        let duty = if period.0 == 0 { 0 } else { pulse.0 as u64 * 100 / period.0 as u64 };
        info!("{}: pulse {} us of {} us ({}%)", self.name, pulse.0, period.0, duty);
        Ok(())
    }
}
