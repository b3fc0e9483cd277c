use super::error::FakeError;
use crate::hal::{pwm::Pwm, time::Microseconds};
use std::vec::Vec;

/// Records every pulse it is asked to produce.
#[derive(Clone, Debug, Default)]
pub struct MockPwm {
    pub pulses: Vec<(Microseconds, Microseconds)>,
    pub fail: bool,
}

impl MockPwm {
    pub fn last_pulse(&self) -> Option<Microseconds> { self.pulses.last().map(|(_, p)| *p) }
}

impl Pwm for MockPwm {
    type Error = FakeError;
    fn set_pulse(&mut self, period: Microseconds, pulse: Microseconds) -> Result<(), FakeError> {
        if self.fail {
            return Err(FakeError::Injected);
        }
        self.pulses.push((period, pulse));
        Ok(())
    }
}
