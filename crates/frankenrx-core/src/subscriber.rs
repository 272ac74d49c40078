#![forbid(unsafe_code)]

//! Protocol enforcement around a raw observer.
//!
//! # Design
//!
//! A [`Subscriber`] owns one [`Observer`] and one [`Subscription`]. Producers
//! push signals into the subscriber; the subscriber forwards them to the
//! observer under the consumer contract.
//!
//! # Invariants
//!
//! 1. At most one terminal signal (`error` or `complete`) reaches the
//!    observer, and nothing reaches it afterwards.
//! 2. After a terminal signal the subscription is closed.
//! 3. Once the subscription is closed, nothing reaches the observer.
//! 4. Hooks are never re-entered: a signal pushed from inside a running hook
//!    is buffered and delivered, in order, after that hook returns.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Signal after terminal/close | Dropped, logged at trace level |
//! | `next`/`complete` hook returns `Err` | [`UnhandledError::Signal`], upstream keeps running |
//! | `error` hook missing or failing | [`UnhandledError::Unobserved`] |
//! | Teardown fails on self-close | [`UnhandledError::Teardown`] |
//! | Work from [`Subscriber::schedule_on`] fails | `error` while active, else [`UnhandledError::Producer`] |

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{ErrorSink, RxError, UnhandledError, UnsubscriptionError};
use crate::notification::Notification;
use crate::observer::Observer;
use crate::scheduler::{Action, Scheduler};
use crate::subscription::{Subscription, TeardownId};

struct SubscriberInner<T> {
    subscription: Subscription,
    observer: RefCell<Option<Box<dyn Observer<T>>>>,
    stopped: Cell<bool>,
    delivering: Cell<bool>,
    backlog: RefCell<VecDeque<Notification<T>>>,
    sink: ErrorSink,
}

/// Consumer handle given to producers.
///
/// Cloning yields another handle to the same consumer, so producers can move
/// it into scheduled work.
pub struct Subscriber<T: 'static> {
    inner: Rc<SubscriberInner<T>>,
}

impl<T: 'static> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Clears the delivering flag even if a hook unwinds.
struct DeliveryGuard<'a>(&'a Cell<bool>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T: 'static> Subscriber<T> {
    /// Wrap `observer`, reporting unhandled faults to `sink`.
    pub fn new(observer: impl Observer<T> + 'static, sink: ErrorSink) -> Self {
        Self::with_subscription(Box::new(observer), Subscription::new(), sink)
    }

    pub(crate) fn with_subscription(
        observer: Box<dyn Observer<T>>,
        subscription: Subscription,
        sink: ErrorSink,
    ) -> Self {
        let inner = Rc::new(SubscriberInner {
            subscription,
            observer: RefCell::new(Some(observer)),
            stopped: Cell::new(false),
            delivering: Cell::new(false),
            backlog: RefCell::new(VecDeque::new()),
            sink,
        });

        // Release the observer once closed; if a hook is running the delivery
        // loop releases it instead.
        let weak: Weak<SubscriberInner<T>> = Rc::downgrade(&inner);
        inner.subscription.add_teardown(move || {
            if let Some(inner) = weak.upgrade() {
                inner.backlog.borrow_mut().clear();
                if let Ok(mut observer) = inner.observer.try_borrow_mut() {
                    observer.take();
                }
            }
        });

        Self { inner }
    }

    /// Push a value.
    pub fn next(&self, value: T) {
        self.deliver(Notification::Next(value));
    }

    /// Push a terminal failure.
    pub fn error(&self, err: RxError) {
        self.deliver(Notification::Error(err));
    }

    /// Push terminal success.
    pub fn complete(&self) {
        self.deliver(Notification::Complete);
    }

    /// Whether a terminal signal has been accepted.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.get()
    }

    /// Whether the subscription is closed. Producers should stop emitting.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.subscription.is_closed()
    }

    /// Handle to this consumer's subscription.
    #[must_use]
    pub fn subscription(&self) -> Subscription {
        self.inner.subscription.clone()
    }

    /// The unhandled-error channel this consumer reports to.
    #[must_use]
    pub fn sink(&self) -> &ErrorSink {
        &self.inner.sink
    }

    /// Close `child` together with this consumer.
    pub fn add(&self, child: &Subscription) {
        if let Err(err) = self.inner.subscription.add(child) {
            self.inner.sink.report(UnhandledError::Teardown(err));
        }
    }

    /// Run `teardown` when this consumer closes.
    pub fn add_teardown(&self, teardown: impl FnOnce() + 'static) -> TeardownId {
        self.inner.subscription.add_teardown(teardown)
    }

    /// Stop receiving signals and run teardowns.
    pub fn unsubscribe(&self) -> Result<(), UnsubscriptionError> {
        self.inner.subscription.unsubscribe()
    }

    /// Route a producer fault: to `error` while this consumer is active,
    /// otherwise to the sink as [`UnhandledError::Producer`].
    pub fn fail(&self, err: RxError) {
        if self.is_stopped() || self.is_closed() {
            self.inner.sink.report(UnhandledError::Producer(err));
        } else {
            self.error(err);
        }
    }

    /// Schedule producer work on behalf of this consumer.
    ///
    /// The action becomes a child of this consumer, so closing the consumer
    /// cancels it. Work is skipped once the consumer is closed, and an `Err`
    /// from the work goes through [`fail`](Self::fail) instead of the
    /// scheduler's sink.
    pub fn schedule_on<Sch, S, F>(
        &self,
        scheduler: &Sch,
        mut work: F,
        delay: u64,
        state: S,
    ) -> Subscription
    where
        Sch: Scheduler,
        S: 'static,
        F: FnMut(&Action<S>, S) -> Result<(), RxError> + 'static,
    {
        let target = self.clone();
        let action = scheduler.schedule(
            move |action: &Action<S>, state: S| {
                if target.is_closed() {
                    return Ok(());
                }
                if let Err(err) = work(action, state) {
                    target.fail(err);
                    if let Err(err) = action.unsubscribe() {
                        target.sink().report(UnhandledError::Teardown(err));
                    }
                }
                Ok(())
            },
            delay,
            state,
        );
        self.add(&action);
        action
    }

    fn deliver(&self, notification: Notification<T>) {
        let inner = &self.inner;
        if inner.stopped.get() || self.is_closed() {
            tracing::trace!(
                terminal = notification.is_terminal(),
                "dropping signal for stopped subscriber"
            );
            return;
        }
        if notification.is_terminal() {
            inner.stopped.set(true);
        }
        inner.backlog.borrow_mut().push_back(notification);
        if inner.delivering.replace(true) {
            return;
        }

        {
            let _guard = DeliveryGuard(&inner.delivering);
            loop {
                let Some(notification) = inner.backlog.borrow_mut().pop_front() else {
                    break;
                };
                if self.is_closed() {
                    inner.backlog.borrow_mut().clear();
                    break;
                }
                self.dispatch(notification);
            }
        }

        if self.is_closed() {
            inner.observer.borrow_mut().take();
        }
    }

    fn dispatch(&self, notification: Notification<T>) {
        let inner = &self.inner;
        let terminal = notification.is_terminal();
        let is_error = matches!(notification, Notification::Error(_));

        let result = {
            let mut observer = inner.observer.borrow_mut();
            match observer.as_mut() {
                Some(observer) => notification.accept(observer.as_mut()),
                None => Ok(()),
            }
        };

        if let Err(err) = result {
            let report = if is_error {
                UnhandledError::Unobserved(err)
            } else {
                UnhandledError::Signal(err)
            };
            inner.sink.report(report);
        }

        if terminal {
            if let Err(err) = inner.subscription.unsubscribe() {
                inner.sink.report(UnhandledError::Teardown(err));
            }
        }
    }
}

impl<T: 'static> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("stopped", &self.is_stopped())
            .field("closed", &self.is_closed())
            .finish()
    }
}
