//! Cooperative work queue.
//!
//! A single consumer drains a FIFO of ready [`WorkItem`]s, running each
//! handler to completion and yielding after every one of them. Producers on
//! any thread submit items, either immediately or after a delay. An item can
//! only be outstanding once: submitting an item that is already pending
//! coalesces with the submission already in the queue.
//!
//! The pending flag is cleared when the item is dequeued, right before its
//! handler runs. A handler can therefore submit its own item again while it is
//! running, which is how periodic work (blinking, for example) reschedules
//! itself.

use crate::{
    error::Error,
    hal::{
        thread::Yield,
        time::{Instant, Milliseconds, Now},
    },
};
use core::fmt;
use log::{debug, info, trace};
use std::{
    boxed::Box,
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
};

pub mod timer;

use timer::Timers;

/// Body of a work item.
pub trait Handler: Send + Sync {
    fn handle(&self, item: &Arc<WorkItem>, queue: &WorkQueue);
}

impl<C> Handler for C
where
    C: Fn(&Arc<WorkItem>, &WorkQueue) + Send + Sync,
{
    fn handle(&self, item: &Arc<WorkItem>, queue: &WorkQueue) { self(item, queue) }
}

/// A unit of deferred work. Owned by whoever created it; the queue only
/// holds references while the item is outstanding.
pub struct WorkItem {
    name: &'static str,
    pending: AtomicBool,
    handler: Box<dyn Handler>,
}

impl WorkItem {
    pub fn new<H: Handler + 'static>(name: &'static str, handler: H) -> Arc<Self> {
        Arc::new(Self { name, pending: AtomicBool::new(false), handler: Box::new(handler) })
    }

    pub fn from_fn<C>(name: &'static str, handler: C) -> Arc<Self>
    where
        C: Fn(&Arc<WorkItem>, &WorkQueue) + Send + Sync + 'static,
    {
        Self::new(name, handler)
    }

    pub fn name(&self) -> &'static str { self.name }

    /// Whether the item sits in the ready queue waiting to run.
    pub fn is_pending(&self) -> bool { self.pending.load(Ordering::Acquire) }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("name", &self.name)
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Outcome of an immediate submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// The item was appended to the ready queue.
    Queued,
    /// The item was already pending; nothing changed.
    Coalesced,
}

struct State {
    initialized: bool,
    run_queue: VecDeque<Arc<WorkItem>>,
    timers: Timers,
}

struct Shared {
    state: Mutex<State>,
    ready: Condvar,
    clock: Box<dyn Now>,
    cooperative: Box<dyn Yield>,
}

/// Handle to a work queue. Clones refer to the same queue.
#[derive(Clone)]
pub struct WorkQueue {
    shared: Arc<Shared>,
}

impl WorkQueue {
    /// Creates an uninitialized queue. Nothing can be submitted until
    /// [`WorkQueue::init`] is called.
    pub fn new<C: Now + 'static, Y: Yield + 'static>(clock: C, cooperative: Y) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    initialized: false,
                    run_queue: VecDeque::new(),
                    timers: Timers::default(),
                }),
                ready: Condvar::new(),
                clock: Box::new(clock),
                cooperative: Box::new(cooperative),
            }),
        }
    }

    /// Empties the queue and makes it ready for submissions. On a queue that
    /// is already live, every queued item is dropped (its pending flag
    /// cleared) and every armed timer disarmed.
    pub fn init(&self) {
        let mut state = self.lock();
        let State { initialized, run_queue, timers } = &mut *state;
        if *initialized {
            debug!(
                "Reinitializing work queue, dropping {} ready and {} delayed items",
                run_queue.len(),
                timers.len()
            );
        }
        run_queue.drain(..).for_each(|item| item.pending.store(false, Ordering::Release));
        timers.clear();
        *initialized = true;
        info!("Work queue initialized");
    }

    /// Appends `item` to the ready queue unless it is already pending.
    pub fn submit(&self, item: &Arc<WorkItem>) -> Result<Submission, Error> {
        let mut state = self.initialized_state()?;
        let submission = Self::enqueue(&mut state, item);
        drop(state);
        if submission == Submission::Queued {
            self.shared.ready.notify_one();
        }
        Ok(submission)
    }

    /// Arms a deadline `delay` from now for `item`. Submitting an item that
    /// is already armed replaces its deadline, so the last submission wins.
    /// A zero delay submits the item right away.
    ///
    /// The deadline only governs when the item enters the ready queue. If the
    /// item is already pending when the deadline passes, the two coalesce.
    pub fn submit_delayed<D: Into<Milliseconds>>(
        &self,
        item: &Arc<WorkItem>,
        delay: D,
    ) -> Result<(), Error> {
        let delay = delay.into();
        let mut state = self.initialized_state()?;
        if delay.0 == 0 {
            state.timers.disarm(item);
            Self::enqueue(&mut state, item);
        } else {
            let deadline = self.shared.clock.now() + delay;
            if state.timers.arm(item.clone(), deadline) {
                debug!("Re-armed {} for {} ms", item.name, delay.0);
            } else {
                trace!("Armed {} for {} ms", item.name, delay.0);
            }
        }
        drop(state);
        // Wakes the consumer to either run the item or shorten its wait.
        self.shared.ready.notify_one();
        Ok(())
    }

    /// Disarms the deadline of `item`, returning whether one was armed.
    ///
    /// Once a deadline has passed the item is a regular ready item, and
    /// cancelling no longer stops it from running.
    pub fn cancel_delayed(&self, item: &Arc<WorkItem>) -> bool {
        let cancelled = self.lock().timers.disarm(item);
        if cancelled {
            trace!("Cancelled timer for {}", item.name);
        }
        cancelled
    }

    /// Moves every item whose deadline has passed into the ready queue.
    /// Returns how many deadlines expired.
    pub fn poll_timers(&self) -> usize {
        let expired = {
            let mut state = self.lock();
            self.fire_expired(&mut state)
        };
        if expired > 0 {
            self.shared.ready.notify_one();
        }
        expired
    }

    /// Runs at most one ready item without blocking. Returns whether an item
    /// was dequeued.
    pub fn run_once(&self) -> bool {
        let next = {
            let mut state = self.lock();
            self.fire_expired(&mut state);
            Self::take_next(&mut state)
        };
        match next {
            Some((item, was_pending)) => {
                self.dispatch(item, was_pending);
                true
            }
            None => false,
        }
    }

    /// Runs ready items until none are left, returning how many were
    /// dequeued. Delayed items only join in once their deadline has passed,
    /// and an item that resubmits itself immediately keeps this from
    /// returning.
    pub fn run_until_idle(&self) -> usize {
        let mut dequeued = 0;
        while self.run_once() {
            dequeued += 1;
        }
        dequeued
    }

    /// Consumer loop. Blocks while there is nothing to run, waking up on
    /// submissions and timer deadlines.
    pub fn run_forever(&self) -> ! {
        info!("Work queue running");
        loop {
            let (item, was_pending) = self.wait_for_work();
            self.dispatch(item, was_pending);
        }
    }

    pub fn is_armed(&self, item: &Arc<WorkItem>) -> bool { self.lock().timers.is_armed(item) }

    /// Number of items in the ready queue.
    pub fn ready_len(&self) -> usize { self.lock().run_queue.len() }

    pub fn next_deadline(&self) -> Option<Instant> { self.lock().timers.next_deadline() }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn initialized_state(&self) -> Result<MutexGuard<'_, State>, Error> {
        let state = self.lock();
        if state.initialized {
            Ok(state)
        } else {
            Err(Error::QueueNotInitialized)
        }
    }

    fn enqueue(state: &mut State, item: &Arc<WorkItem>) -> Submission {
        if item.pending.swap(true, Ordering::AcqRel) {
            debug!("{} already pending, submission coalesced", item.name);
            Submission::Coalesced
        } else {
            state.run_queue.push_back(item.clone());
            Submission::Queued
        }
    }

    fn fire_expired(&self, state: &mut State) -> usize {
        let expired = state.timers.expire(self.shared.clock.now());
        for item in &expired {
            trace!("Timer for {} fired", item.name);
            Self::enqueue(state, item);
        }
        expired.len()
    }

    /// Pops the head of the ready queue, clearing its pending flag.
    fn take_next(state: &mut State) -> Option<(Arc<WorkItem>, bool)> {
        let item = state.run_queue.pop_front()?;
        let was_pending = item.pending.swap(false, Ordering::AcqRel);
        Some((item, was_pending))
    }

    fn wait_for_work(&self) -> (Arc<WorkItem>, bool) {
        let mut state = self.lock();
        loop {
            self.fire_expired(&mut state);
            if let Some(next) = Self::take_next(&mut state) {
                return next;
            }
            state = match state.timers.next_deadline() {
                Some(deadline) => {
                    let wait = (deadline - self.shared.clock.now()).max(Milliseconds(1));
                    self.shared
                        .ready
                        .wait_timeout(state, wait.into())
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self.shared.ready.wait(state).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    fn dispatch(&self, item: Arc<WorkItem>, was_pending: bool) {
        if was_pending {
            trace!("Running {}", item.name);
            item.handler.handle(&item, self);
        } else {
            // Only reachable if the flag was cleared behind the queue's back.
            debug!("Skipping {}: no longer pending", item.name);
        }
        self.shared.cooperative.yield_now();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        hal::{
            doubles::{thread::CountingYield, time::MockClock},
            time::U32Ext,
        },
        ports::native_sim::{clock::SystemClock, thread::ThreadYield},
    };
    use std::{
        sync::{atomic::AtomicUsize, mpsc},
        thread,
        time::Duration,
        vec::Vec,
    };

    fn queue() -> (WorkQueue, MockClock, CountingYield) {
        let clock = MockClock::default();
        let cooperative = CountingYield::default();
        let queue = WorkQueue::new(clock.clone(), cooperative.clone());
        queue.init();
        (queue, clock, cooperative)
    }

    fn counting_item(name: &'static str) -> (Arc<WorkItem>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let item = WorkItem::from_fn(name, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (item, runs)
    }

    fn recording_item(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<WorkItem> {
        let log = log.clone();
        WorkItem::from_fn(name, move |item, _| log.lock().unwrap().push(item.name()))
    }

    #[test]
    fn submissions_before_init_are_rejected() {
        // Given
        let queue = WorkQueue::new(MockClock::default(), CountingYield::default());
        let (item, _) = counting_item("early");

        // Then
        assert_eq!(queue.submit(&item), Err(Error::QueueNotInitialized));
        assert_eq!(queue.submit_delayed(&item, 10.ms()), Err(Error::QueueNotInitialized));
        assert!(!queue.cancel_delayed(&item));
        assert!(!item.is_pending());
    }

    #[test]
    fn double_submission_runs_once() {
        // Given
        let (queue, _, _) = queue();
        let (item, runs) = counting_item("twice");

        // When
        assert_eq!(queue.submit(&item), Ok(Submission::Queued));
        assert_eq!(queue.submit(&item), Ok(Submission::Coalesced));

        // Then
        assert_eq!(queue.ready_len(), 1);
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!item.is_pending());
    }

    #[test]
    fn ready_items_run_in_submission_order() {
        // Given
        let (queue, _, _) = queue();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) =
            (recording_item("a", &log), recording_item("b", &log), recording_item("c", &log));

        // When
        queue.submit(&b).unwrap();
        queue.submit(&a).unwrap();
        queue.submit(&c).unwrap();
        // Resubmitting doesn't move an item to the tail.
        queue.submit(&b).unwrap();
        queue.run_until_idle();

        // Then
        assert_eq!(*log.lock().unwrap(), ["b", "a", "c"]);
    }

    #[test]
    fn resubmitted_delay_wins_and_runs_once() {
        // Given
        let (queue, clock, _) = queue();
        let fired_at = Arc::new(Mutex::new(Vec::new()));
        let times = fired_at.clone();
        let now = clock.clone();
        let item = WorkItem::from_fn("blink", move |_, _| times.lock().unwrap().push(now.now()));

        // When
        queue.submit_delayed(&item, 100.ms()).unwrap();
        queue.submit_delayed(&item, 10.ms()).unwrap();

        // Then
        assert_eq!(queue.next_deadline(), Some(Instant(10)));
        clock.advance(9.ms());
        assert!(!queue.run_once());
        clock.advance(1.ms());
        assert!(queue.run_once());
        clock.advance(200.ms());
        assert_eq!(queue.run_until_idle(), 0);
        assert_eq!(*fired_at.lock().unwrap(), [Instant(10)]);
    }

    #[test]
    fn zero_delay_submits_immediately() {
        let (queue, _, _) = queue();
        let (item, runs) = counting_item("now");
        queue.submit_delayed(&item, 50.ms()).unwrap();

        queue.submit_delayed(&item, 0.ms()).unwrap();

        assert!(!queue.is_armed(&item));
        assert!(item.is_pending());
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelling_an_armed_item_stops_it() {
        // Given
        let (queue, clock, _) = queue();
        let (item, runs) = counting_item("cancelled");
        queue.submit_delayed(&item, 20.ms()).unwrap();

        // When
        assert!(queue.cancel_delayed(&item));
        clock.advance(1.s());

        // Then
        assert_eq!(queue.run_until_idle(), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!queue.cancel_delayed(&item));
    }

    #[test]
    fn cancelling_after_the_deadline_does_not_unqueue() {
        // Given
        let (queue, clock, _) = queue();
        let (item, runs) = counting_item("late");
        queue.submit_delayed(&item, 20.ms()).unwrap();
        clock.advance(20.ms());
        assert_eq!(queue.poll_timers(), 1);

        // When
        let cancelled = queue.cancel_delayed(&item);

        // Then
        assert!(!cancelled);
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_deadline_coalesces_with_pending_submission() {
        // Given
        let (queue, clock, _) = queue();
        let (item, runs) = counting_item("both");
        queue.submit_delayed(&item, 5.ms()).unwrap();
        queue.submit(&item).unwrap();

        // When
        clock.advance(5.ms());

        // Then
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handlers_can_resubmit_themselves_while_running() {
        // Given
        let (queue, _, _) = queue();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let item = WorkItem::from_fn("periodic", move |item, queue| {
            assert!(!item.is_pending());
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                assert_eq!(queue.submit(item), Ok(Submission::Queued));
                assert!(item.is_pending());
            }
        });

        // When
        queue.submit(&item).unwrap();

        // Then
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn reinitialization_drops_outstanding_work() {
        // Given
        let (queue, _, _) = queue();
        let (ready, ready_runs) = counting_item("ready");
        let (delayed, _) = counting_item("delayed");
        queue.submit(&ready).unwrap();
        queue.submit_delayed(&delayed, 10.ms()).unwrap();

        // When
        queue.init();

        // Then
        assert_eq!(queue.ready_len(), 0);
        assert!(!queue.is_armed(&delayed));
        assert!(!ready.is_pending());
        assert_eq!(queue.next_deadline(), None);
        assert_eq!(queue.run_until_idle(), 0);
        assert_eq!(ready_runs.load(Ordering::SeqCst), 0);
        assert_eq!(queue.submit(&ready), Ok(Submission::Queued));
    }

    #[test]
    fn queue_yields_after_every_item_even_when_skipped() {
        // Given
        let (queue, _, cooperative) = queue();
        let (a, a_runs) = counting_item("a");
        let (b, b_runs) = counting_item("b");
        queue.submit(&a).unwrap();
        queue.submit(&b).unwrap();
        b.pending.store(false, Ordering::Release);

        // When
        let dequeued = queue.run_until_idle();

        // Then
        assert_eq!(dequeued, 2);
        assert_eq!(a_runs.load(Ordering::SeqCst), 1);
        assert_eq!(b_runs.load(Ordering::SeqCst), 0);
        assert_eq!(cooperative.count(), 2);
    }

    #[test]
    fn producers_on_other_threads_wake_the_consumer() {
        // Given
        let queue = WorkQueue::new(SystemClock::new(), ThreadYield);
        queue.init();
        let (sender, receiver) = mpsc::channel();
        let consumer = queue.clone();
        thread::spawn(move || consumer.run_forever());

        // When
        let producers: Vec<_> = ["one", "two", "three", "four"]
            .into_iter()
            .map(|name| {
                let sender = Mutex::new(sender.clone());
                let item = WorkItem::from_fn(name, move |item, _| {
                    let _ = sender.lock().unwrap().send(item.name());
                });
                let queue = queue.clone();
                thread::spawn(move || {
                    queue.submit_delayed(&item, 5.ms()).unwrap();
                    item
                })
            })
            .collect();
        let _items: Vec<_> = producers.into_iter().map(|p| p.join().unwrap()).collect();

        // Then
        let mut ran: Vec<_> = (0..4)
            .map(|_| receiver.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        ran.sort_unstable();
        assert_eq!(ran, ["four", "one", "three", "two"]);
        assert!(receiver.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
