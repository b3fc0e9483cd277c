use crate::hal::thread::Yield;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Counts cooperative yields. Clones share the count.
#[derive(Clone, Debug, Default)]
pub struct CountingYield {
    yields: Arc<AtomicUsize>,
}

impl CountingYield {
    pub fn count(&self) -> usize { self.yields.load(Ordering::SeqCst) }
}

impl Yield for CountingYield {
    fn yield_now(&self) { self.yields.fetch_add(1, Ordering::SeqCst); }
}
