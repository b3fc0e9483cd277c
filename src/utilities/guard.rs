//! RAII guard that calls a given function when constructed,
//! and another when it drops out of scope.
//!
//! Useful for ensuring resource cleanup no matter the return
//! path. The guarded item stays reachable through the guard
//! while it is alive.
//!
//! Example
//! ```
//! # use meshlight_lib::utilities::guard::*;
//! let mut log = Vec::new();
//! {
//!     // "enter" is pushed as soon as guard is constructed, and
//!     // the log is held protected by the guard (as it has exclusive
//!     // access to it)
//!     let mut guard = Guard::new(&mut log, |l| l.push("enter"), |l| l.push("exit"));
//!     guard.push("work");
//! }
//! // Guard has dropped out of scope here, so "exit" was pushed
//! assert_eq!(log, ["enter", "work", "exit"]);
//! ```

use core::ops::{Deref, DerefMut};

pub struct Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    item: &'a mut T,
    on_exit: Option<G>,
}

impl<'a, T, G> Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    pub fn new<F: FnOnce(&mut T)>(item: &'a mut T, on_entry: F, on_exit: G) -> Self {
        on_entry(item);
        Self { item, on_exit: Some(on_exit) }
    }

    /// Fallible variant of [`Guard::new`]. If `on_entry` fails, no guard is
    /// constructed and `on_exit` is never called.
    pub fn try_new<E, F>(item: &'a mut T, on_entry: F, on_exit: G) -> Result<Self, E>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        on_entry(item)?;
        Ok(Self { item, on_exit: Some(on_exit) })
    }
}

impl<'a, T, G> Deref for Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    type Target = T;
    fn deref(&self) -> &T { self.item }
}

impl<'a, T, G> DerefMut for Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    fn deref_mut(&mut self) -> &mut T { self.item }
}

impl<'a, T, G> Drop for Guard<'a, T, G>
where
    G: FnOnce(&mut T),
{
    fn drop(&mut self) {
        if let Some(on_exit) = self.on_exit.take() {
            on_exit(self.item);
        }
    }
}
