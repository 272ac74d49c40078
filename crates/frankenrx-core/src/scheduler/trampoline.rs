#![forbid(unsafe_code)]

//! Run-immediately scheduler backed by a trampoline queue.

use std::rc::Rc;

use super::queue::{DrainMode, SchedulerQueue};
use super::{Action, Scheduler, VirtualTime};
use crate::config::SchedulerConfig;
use crate::error::RxError;
use crate::subscription::Subscription;

/// Scheduler that runs work synchronously in the caller's stack.
///
/// When idle, `schedule` drains the queue before returning. When called from
/// inside running work, the new action is appended and runs after the current
/// one finishes, in submission order. Delays only order work: the clock jumps
/// straight to each due time. `max_frames` is ignored, since nothing could
/// run the work left past it.
#[derive(Debug, Clone)]
pub struct QueueScheduler {
    queue: Rc<SchedulerQueue>,
}

impl Default for QueueScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueScheduler {
    /// Scheduler at time zero with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Scheduler built from an explicit configuration.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            queue: SchedulerQueue::new(DrainMode::Eager, config),
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

    /// Whether the queue is currently draining.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.queue.is_draining()
    }

    /// Number of queued actions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Scheduler for QueueScheduler {
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
