//! Cooperative yield for the host.
use crate::hal::thread::Yield;

/// Yields the current OS thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadYield;

impl Yield for ThreadYield {
    fn yield_now(&self) { std::thread::yield_now() }
}
