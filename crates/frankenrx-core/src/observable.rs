#![forbid(unsafe_code)]

//! Lazy, push-based producers.
//!
//! # Design
//!
//! [`Observable<T>`] holds one immutable subscribe procedure behind an `Rc`.
//! Nothing runs until [`subscribe`](Observable::subscribe) is called, and
//! every call re-runs the procedure from scratch (cold semantics): no state
//! is shared between two subscriptions unless the procedure captures it
//! explicitly.
//!
//! The procedure receives a [`Subscriber`] and may return teardown logic
//! (nothing, a [`Subscription`], or a callback) to run when the subscriber
//! closes. An `Err` return is routed to the subscriber's `error` path, or to
//! the error sink if the subscriber can no longer receive it.
//!
//! # Example
//!
//! ```
//! use frankenrx_core::prelude::*;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let numbers = Observable::new(|subscriber: Subscriber<i32>| {
//!     subscriber.next(1);
//!     subscriber.next(2);
//!     subscriber.complete();
//!     Ok(())
//! });
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! numbers.subscribe(move |v: i32| sink.borrow_mut().push(v));
//! assert_eq!(*seen.borrow(), vec![1, 2]);
//! ```

use std::fmt;
use std::rc::Rc;

use crate::error::{ErrorSink, RxError};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;

/// What a subscribe procedure hands back for cleanup.
pub enum TeardownLogic {
    /// Nothing to clean up.
    None,
    /// Close this subscription with the subscriber.
    Subscription(Subscription),
    /// Run this callback when the subscriber closes.
    Callback(Box<dyn FnOnce()>),
}

impl TeardownLogic {
    /// Teardown from a callback.
    pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
        Self::Callback(Box::new(f))
    }
}

impl From<()> for TeardownLogic {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<Subscription> for TeardownLogic {
    fn from(subscription: Subscription) -> Self {
        Self::Subscription(subscription)
    }
}

impl fmt::Debug for TeardownLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Subscription(sub) => f.debug_tuple("Subscription").field(sub).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

type Producer<T> = dyn Fn(Subscriber<T>) -> Result<TeardownLogic, RxError>;

/// A lazy producer of `T` values.
///
/// Cloning shares the subscribe procedure, not any execution state.
pub struct Observable<T: 'static> {
    producer: Rc<Producer<T>>,
}

impl<T: 'static> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T: 'static> Observable<T> {
    /// Wrap a subscribe procedure.
    pub fn new<F, L>(producer: F) -> Self
    where
        F: Fn(Subscriber<T>) -> Result<L, RxError> + 'static,
        L: Into<TeardownLogic>,
    {
        Self {
            producer: Rc::new(move |subscriber| producer(subscriber).map(Into::into)),
        }
    }

    /// Subscribe, reporting unhandled faults through the default sink.
    pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
        self.subscribe_with(observer, ErrorSink::default())
    }

    /// Subscribe, reporting unhandled faults to `sink`.
    pub fn subscribe_with(
        &self,
        observer: impl Observer<T> + 'static,
        sink: ErrorSink,
    ) -> Subscription {
        self.subscribe_subscriber(Subscriber::new(observer, sink))
    }

    /// Run the subscribe procedure against an existing subscriber.
    ///
    /// Operators use this to attach their operator subscriber to a source.
    pub fn subscribe_subscriber(&self, subscriber: Subscriber<T>) -> Subscription {
        match (self.producer)(subscriber.clone()) {
            Ok(TeardownLogic::None) => {}
            Ok(TeardownLogic::Subscription(sub)) => subscriber.add(&sub),
            Ok(TeardownLogic::Callback(teardown)) => {
                subscriber.add_teardown(teardown);
            }
            Err(err) => subscriber.fail(err),
        }
        subscriber.subscription()
    }

    /// Apply an operator: `source.pipe(a).pipe(b)` composes left to right.
    pub fn pipe<R, F>(self, operator: F) -> Observable<R>
    where
        R: 'static,
        F: FnOnce(Observable<T>) -> Observable<R>,
    {
        operator(self)
    }
}

impl<T: 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}
