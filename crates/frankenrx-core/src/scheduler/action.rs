#![forbid(unsafe_code)]

//! Cancellable, reschedulable unit of work.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::VirtualTime;
use super::queue::{PendingTask, QueueKey, SchedulerQueue};
use crate::error::{ErrorSink, RxError, UnhandledError, UnsubscriptionError};
use crate::subscription::Subscription;

type WorkFn<S> = dyn FnMut(&Action<S>, S) -> Result<(), RxError>;

// The queue owns pending actions, so actions only point back at it weakly.
struct ActionInner<S: 'static> {
    subscription: Subscription,
    queue: Weak<SchedulerQueue>,
    sink: ErrorSink,
    work: RefCell<Option<Box<WorkFn<S>>>>,
    state: RefCell<Option<S>>,
    key: Cell<Option<QueueKey>>,
}

/// A unit of work bound to one scheduler.
///
/// An action is a subscription: closing it removes any pending queue entry
/// and the work never runs again. Work that is already running finishes its
/// current call, but any reschedule it attempts after the close is ignored.
///
/// An action whose work returns without rescheduling closes itself. Once
/// every handle to its scheduler is dropped, rescheduling does nothing.
pub struct Action<S: 'static> {
    inner: Rc<ActionInner<S>>,
}

impl<S: 'static> Clone for Action<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: 'static> Action<S> {
    pub(crate) fn new(queue: &Rc<SchedulerQueue>, work: Box<WorkFn<S>>) -> Self {
        let inner = Rc::new(ActionInner {
            subscription: Subscription::new(),
            queue: Rc::downgrade(queue),
            sink: queue.sink().clone(),
            work: RefCell::new(Some(work)),
            state: RefCell::new(None),
            key: Cell::new(None),
        });

        let weak: Weak<ActionInner<S>> = Rc::downgrade(&inner);
        inner.subscription.add_teardown(move || {
            if let Some(inner) = weak.upgrade() {
                inner.cancel();
            }
        });

        Self { inner }
    }

    /// Queue this action to run again with `state` after `delay` ticks.
    ///
    /// If the action is already queued, the earlier entry is replaced. On a
    /// closed action this does nothing.
    pub fn schedule(&self, state: S, delay: u64) -> Subscription {
        let inner = &self.inner;
        if inner.subscription.is_closed() {
            tracing::trace!("ignoring reschedule of closed action");
            return self.subscription();
        }
        let Some(queue) = inner.queue.upgrade() else {
            tracing::trace!("ignoring reschedule after scheduler was dropped");
            inner.close();
            return self.subscription();
        };
        if let Some(previous) = inner.key.take() {
            queue.remove(previous);
        }
        *inner.state.borrow_mut() = Some(state);
        let task: Rc<dyn PendingTask> = Rc::clone(inner) as Rc<dyn PendingTask>;
        let key = queue.enqueue(task, delay);
        inner.key.set(Some(key));
        queue.kick();
        self.subscription()
    }

    /// Current virtual time of the owning scheduler, or time zero once the
    /// scheduler is gone.
    #[must_use]
    pub fn now(&self) -> VirtualTime {
        self.inner
            .queue
            .upgrade()
            .map_or(VirtualTime::ZERO, |queue| queue.now())
    }

    /// Whether this action is waiting in its scheduler's queue.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.key.get().is_some()
    }

    /// Whether this action has been cancelled or has finished.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.subscription.is_closed()
    }

    /// Cancel the action.
    pub fn unsubscribe(&self) -> Result<(), UnsubscriptionError> {
        self.inner.subscription.unsubscribe()
    }

    /// Subscription handle for this action.
    #[must_use]
    pub fn subscription(&self) -> Subscription {
        self.inner.subscription.clone()
    }
}

impl<S: 'static> ActionInner<S> {
    fn cancel(&self) {
        if let Some(key) = self.key.take()
            && let Some(queue) = self.queue.upgrade()
        {
            queue.remove(key);
        }
        self.state.borrow_mut().take();
        self.work.borrow_mut().take();
    }

    fn close(&self) {
        if let Err(err) = self.subscription.unsubscribe() {
            self.sink.report(UnhandledError::Teardown(err));
        }
    }
}

impl<S: 'static> PendingTask for ActionInner<S> {
    fn run(self: Rc<Self>, key: QueueKey) {
        if self.key.get() == Some(key) {
            self.key.set(None);
        }
        if self.subscription.is_closed() {
            return;
        }
        let Some(state) = self.state.borrow_mut().take() else {
            return;
        };
        let Some(mut work) = self.work.borrow_mut().take() else {
            return;
        };

        let action = Action {
            inner: Rc::clone(&self),
        };
        let result = work(&action, state);

        if !self.subscription.is_closed() {
            *self.work.borrow_mut() = Some(work);
        }
        match result {
            Err(err) => {
                self.close();
                self.sink.report(UnhandledError::Work(err));
            }
            Ok(()) if self.key.get().is_none() => self.close(),
            Ok(()) => {}
        }
    }
}

impl<S: 'static> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("closed", &self.is_closed())
            .field("pending", &self.is_pending())
            .finish()
    }
}
