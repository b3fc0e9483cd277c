//! Delay layer of the work queue.
//!
//! Armed items are kept sorted by deadline. Items sharing a deadline expire in
//! the order they were armed.

use super::WorkItem;
use crate::hal::time::Instant;
use std::{sync::Arc, vec::Vec};

/// A work item waiting for its deadline.
#[derive(Clone, Debug)]
pub struct DelayedWorkItem {
    pub item: Arc<WorkItem>,
    pub deadline: Instant,
}

#[derive(Debug, Default)]
pub struct Timers {
    armed: Vec<DelayedWorkItem>,
}

impl Timers {
    /// Arms a deadline for `item`, replacing any deadline it already had.
    /// Returns whether an earlier deadline was replaced.
    pub fn arm(&mut self, item: Arc<WorkItem>, deadline: Instant) -> bool {
        let rearmed = self.disarm(&item);
        let position = self.armed.partition_point(|delayed| delayed.deadline <= deadline);
        self.armed.insert(position, DelayedWorkItem { item, deadline });
        rearmed
    }

    /// Returns whether there was a deadline to disarm.
    pub fn disarm(&mut self, item: &Arc<WorkItem>) -> bool {
        match self.armed.iter().position(|delayed| Arc::ptr_eq(&delayed.item, item)) {
            Some(index) => {
                self.armed.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, item: &Arc<WorkItem>) -> bool {
        self.armed.iter().any(|delayed| Arc::ptr_eq(&delayed.item, item))
    }

    pub fn next_deadline(&self) -> Option<Instant> { self.armed.first().map(|d| d.deadline) }

    /// Removes and returns, in deadline order, every item due at `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<Arc<WorkItem>> {
        let due = self.armed.partition_point(|delayed| delayed.deadline <= now);
        self.armed.drain(..due).map(|delayed| delayed.item).collect()
    }

    pub fn clear(&mut self) { self.armed.clear(); }

    pub fn len(&self) -> usize { self.armed.len() }

    pub fn is_empty(&self) -> bool { self.armed.is_empty() }
}
