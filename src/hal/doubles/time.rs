use crate::hal::time::{Instant, Milliseconds, Now};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Manually advanced monotonic clock. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct MockClock {
    milliseconds: Arc<AtomicU64>,
}

impl MockClock {
    pub fn advance<T: Into<Milliseconds>>(&self, span: T) {
        self.milliseconds.fetch_add(span.into().0 as u64, Ordering::SeqCst);
    }
}

impl Now for MockClock {
    fn now(&self) -> Instant { Instant(self.milliseconds.load(Ordering::SeqCst)) }
}
