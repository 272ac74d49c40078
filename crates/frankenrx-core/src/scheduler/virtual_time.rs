#![forbid(unsafe_code)]

//! Manually driven scheduler with a virtual clock.

use std::rc::Rc;

use super::queue::{DrainMode, SchedulerQueue};
use super::{Action, Scheduler, VirtualTime};
use crate::config::SchedulerConfig;
use crate::error::RxError;
use crate::subscription::Subscription;

/// Scheduler whose queue only drains when its owner says so.
///
/// Cloning yields another handle to the same queue and clock.
///
/// # Example
///
/// ```
/// use frankenrx_core::scheduler::{Scheduler, VirtualTimeScheduler};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let scheduler = VirtualTimeScheduler::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
/// for (name, delay) in [("A", 0), ("B", 0), ("C", 10)] {
///     let log = Rc::clone(&log);
///     scheduler.schedule(move |_, _: ()| { log.borrow_mut().push(name); Ok(()) }, delay, ());
/// }
/// scheduler.flush();
/// assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
/// ```
#[derive(Debug, Clone)]
pub struct VirtualTimeScheduler {
    queue: Rc<SchedulerQueue>,
}

impl Default for VirtualTimeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualTimeScheduler {
    /// Scheduler at time zero with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Scheduler built from an explicit configuration.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            queue: SchedulerQueue::new(DrainMode::Manual, config),
        }
    }

    /// Schedule work and keep the typed [`Action`] handle.
    pub fn schedule_action<S, F>(&self, work: F, delay: u64, state: S) -> Action<S>
    where
        S: 'static,
        F: FnMut(&Action<S>, S) -> Result<(), RxError> + 'static,
    {
        self.queue.schedule(work, delay, state)
    }

    /// Run every queued action, moving the clock to each due time.
    ///
    /// Work queued while flushing runs in the same flush. Entries beyond the
    /// configured `max_frames` stay queued. Calling this from inside running
    /// work does nothing. Returns the number of actions run.
    pub fn flush(&self) -> usize {
        self.queue.drain_until(None)
    }

    /// Run everything due at or before `to`, then move the clock to `to`.
    pub fn advance_to(&self, to: VirtualTime) -> usize {
        let executed = self.queue.drain_until(Some(to));
        if !self.queue.is_draining() {
            self.queue.set_clock(to);
        }
        executed
    }

    /// Advance the clock by `ticks`, running everything that comes due.
    pub fn advance_by(&self, ticks: u64) -> usize {
        self.advance_to(self.now() + ticks)
    }

    /// Number of queued actions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Scheduler for VirtualTimeScheduler {
    fn now(&self) -> VirtualTime {
        self.queue.now()
    }

    fn schedule<S, F>(&self, work: F, delay: u64, state: S) -> Subscription
    where
        S: 'static,
        F: FnMut(&Action<S>, S) -> Result<(), RxError> + 'static,
    {
        self.schedule_action(work, delay, state).subscription()
    }
}
