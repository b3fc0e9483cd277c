//! Monotonic time on the host.
use crate::hal::time::{Instant, Now};
use std::time;

/// Milliseconds elapsed since the clock was created.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: time::Instant,
}

impl SystemClock {
    pub fn new() -> Self { Self { origin: time::Instant::now() } }
}

impl Default for SystemClock {
    fn default() -> Self { Self::new() }
}

impl Now for SystemClock {
    fn now(&self) -> Instant { Instant(self.origin.elapsed().as_millis() as u64) }
}
