#![forbid(unsafe_code)]

//! Deferred, ordered execution of work units.
//!
//! A scheduler owns a queue of pending [`Action`]s keyed by
//! `(virtual time, submission sequence)`. Draining the queue is an explicit
//! loop: work that reschedules its own action only pushes a new queue entry,
//! so unbounded rescheduling never grows the call stack.
//!
//! Two schedulers share the same queue core:
//!
//! - [`VirtualTimeScheduler`]: nothing runs until the owner calls
//!   [`flush`](VirtualTimeScheduler::flush) or advances the clock.
//! - [`QueueScheduler`]: a trampoline. Scheduling from an idle context drains
//!   the queue synchronously in the caller's stack; scheduling from inside
//!   running work appends to the queue and runs after the current action.
//!
//! # Invariants
//!
//! 1. Actions due at the same virtual time run in submission order.
//! 2. The clock never moves backwards.
//! 3. A cancelled action is removed from the queue and never runs.
//! 4. Rescheduling a closed action is a no-op.

mod action;
mod queue;
mod trampoline;
mod virtual_time;

use std::fmt;
use std::ops::Add;

use crate::error::RxError;
use crate::subscription::Subscription;

pub use action::Action;
pub use trampoline::QueueScheduler;
pub use virtual_time::VirtualTimeScheduler;

/// A scheduler's own notion of "now", in abstract ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    /// Construct from a tick count.
    #[must_use]
    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Tick count since time zero.
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }
}

impl Add<u64> for VirtualTime {
    type Output = Self;

    fn add(self, delay: u64) -> Self {
        Self(self.0.saturating_add(delay))
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Ordering and timing service for deferred work.
pub trait Scheduler {
    /// Current virtual time.
    fn now(&self) -> VirtualTime;

    /// Queue `work` to run with `state` at `now() + delay`.
    ///
    /// The work receives its own [`Action`] so it can reschedule itself.
    /// The returned subscription cancels the work if closed before it runs.
    fn schedule<S, F>(&self, work: F, delay: u64, state: S) -> Subscription
    where
        S: 'static,
        F: FnMut(&Action<S>, S) -> Result<(), RxError> + 'static;
}
