#![forbid(unsafe_code)]

//! Queue core shared by every scheduler.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::VirtualTime;
use super::action::Action;
use crate::config::SchedulerConfig;
use crate::error::{ErrorSink, RxError};

/// Position of an entry in the queue: due time, then submission sequence.
pub(crate) type QueueKey = (VirtualTime, u64);

/// Type-erased pending action.
pub(crate) trait PendingTask {
    fn run(self: Rc<Self>, key: QueueKey);
}

/// When the queue drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainMode {
    /// Only on explicit flush/advance calls.
    Manual,
    /// Right after any enqueue made while the queue is idle.
    Eager,
}

pub(crate) struct SchedulerQueue {
    clock: Cell<VirtualTime>,
    seq: Cell<u64>,
    draining: Cell<bool>,
    pending: RefCell<BTreeMap<QueueKey, Rc<dyn PendingTask>>>,
    mode: DrainMode,
    config: SchedulerConfig,
}

/// Clears the draining flag even if work unwinds.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl SchedulerQueue {
    pub(crate) fn new(mode: DrainMode, config: SchedulerConfig) -> Rc<Self> {
        Rc::new(Self {
            clock: Cell::new(config.start),
            seq: Cell::new(0),
            draining: Cell::new(false),
            pending: RefCell::new(BTreeMap::new()),
            mode,
            config,
        })
    }

    pub(crate) fn now(&self) -> VirtualTime {
        self.clock.get()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub(crate) fn is_draining(&self) -> bool {
        self.draining.get()
    }

    pub(crate) fn schedule<S, F>(self: &Rc<Self>, work: F, delay: u64, state: S) -> Action<S>
    where
        S: 'static,
        F: FnMut(&Action<S>, S) -> Result<(), RxError> + 'static,
    {
        let action = Action::new(self, Box::new(work));
        action.schedule(state, delay);
        action
    }

    pub(crate) fn enqueue(&self, task: Rc<dyn PendingTask>, delay: u64) -> QueueKey {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        let key = (self.now() + delay, seq);
        if self.config.trace_actions {
            tracing::trace!(due = %key.0, seq, "action queued");
        }
        self.pending.borrow_mut().insert(key, task);
        key
    }

    pub(crate) fn remove(&self, key: QueueKey) -> bool {
        let removed = self.pending.borrow_mut().remove(&key).is_some();
        if removed && self.config.trace_actions {
            tracing::trace!(due = %key.0, seq = key.1, "action cancelled");
        }
        removed
    }

    /// Drain right away if this queue is eager and idle.
    pub(crate) fn kick(&self) {
        if self.mode == DrainMode::Eager && !self.is_draining() {
            self.drain_until(None);
        }
    }

    /// Run queued actions in `(due, seq)` order.
    ///
    /// Entries due after `limit`, or after the configured `max_frames`
    /// horizon, stay queued. Eager queues have no later flush, so they ignore
    /// `max_frames`. Returns the number of actions run. A nested call made
    /// from inside running work returns 0 without running anything.
    pub(crate) fn drain_until(&self, limit: Option<VirtualTime>) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let _guard = DrainGuard(&self.draining);
        let _span = tracing::debug_span!("scheduler_drain", start = %self.now()).entered();

        let max_frames = match self.mode {
            DrainMode::Manual => self.config.max_frames,
            DrainMode::Eager => None,
        };
        let horizon = match (limit, max_frames) {
            (Some(limit), Some(max)) => Some(limit.min(VirtualTime::new(max))),
            (Some(limit), None) => Some(limit),
            (None, Some(max)) => Some(VirtualTime::new(max)),
            (None, None) => None,
        };

        let mut executed = 0;
        while let Some((key, task)) = self.pop_due(horizon) {
            if key.0 > self.now() {
                self.clock.set(key.0);
            }
            if self.config.trace_actions {
                tracing::trace!(due = %key.0, seq = key.1, "action running");
            }
            task.run(key);
            executed += 1;
        }
        tracing::debug!(executed, now = %self.now(), "scheduler drain finished");
        executed
    }

    /// Move the clock forward without running anything.
    pub(crate) fn set_clock(&self, to: VirtualTime) {
        if to > self.now() {
            self.clock.set(to);
        }
    }

    pub(crate) fn sink(&self) -> &ErrorSink {
        &self.config.error_sink
    }

    fn pop_due(&self, horizon: Option<VirtualTime>) -> Option<(QueueKey, Rc<dyn PendingTask>)> {
        let mut pending = self.pending.borrow_mut();
        let key = *pending.keys().next()?;
        if horizon.is_some_and(|h| key.0 > h) {
            return None;
        }
        pending.remove(&key).map(|task| (key, task))
    }
}

impl fmt::Debug for SchedulerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerQueue")
            .field("now", &self.now())
            .field("pending", &self.len())
            .field("draining", &self.is_draining())
            .field("mode", &self.mode)
            .finish()
    }
}
