//! Output pin double recording every level written, stamped with the time
//! of a shared mock clock.
use super::time::MockClock;
use crate::hal::{
    gpio::OutputPin,
    time::{Instant, Milliseconds, Now},
};
use std::vec::Vec;

#[derive(Clone, Debug, Default)]
pub struct MockPin {
    clock: MockClock,
    high: bool,
    pub writes: Vec<(Instant, bool)>,
}

impl MockPin {
    /// Pin stamping its writes with `clock`.
    pub fn stamped(clock: MockClock) -> Self { Self { clock, ..Default::default() } }

    pub fn is_high(&self) -> bool { self.high }

    pub fn levels(&self) -> Vec<bool> { self.writes.iter().map(|(_, level)| *level).collect() }

    /// Writes that actually flipped the pin, starting from low.
    pub fn toggles(&self) -> usize {
        let mut previous = false;
        self.writes
            .iter()
            .filter(|(_, level)| {
                let flipped = *level != previous;
                previous = *level;
                flipped
            })
            .count()
    }

    /// Spans between consecutive writes.
    pub fn intervals(&self) -> Vec<Milliseconds> {
        self.writes.windows(2).map(|pair| pair[1].0 - pair[0].0).collect()
    }

    fn record(&mut self, high: bool) {
        self.high = high;
        self.writes.push((self.clock.now(), high));
    }
}

impl OutputPin for MockPin {
    fn set_low(&mut self) { self.record(false) }
    fn set_high(&mut self) { self.record(true) }
}
