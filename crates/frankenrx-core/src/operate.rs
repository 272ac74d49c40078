#![forbid(unsafe_code)]

//! Building operator subscribers.
//!
//! An operator subscribes to its source with a fresh subscriber that forwards
//! or transforms signals into the downstream subscriber. [`operate`] builds
//! that subscriber: each hook is optional and defaults to forwarding the
//! signal unchanged.
//!
//! Forwarding `next` unchanged only type-checks when the source and
//! destination value types match, so [`operate`] is for `T -> T` operators
//! and [`operate_with`] takes a mandatory `next` hook for `T -> R`.
//!
//! # Invariants
//!
//! 1. The operator subscriber is a child of the destination: closing the
//!    destination closes it, and through it the source.
//! 2. Closing the operator subscriber does not close the destination.
//! 3. A hook that returns `Err` sends the error to the destination and
//!    unsubscribes from the source.

use crate::error::{RxError, UnhandledError};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;

type NextHook<T, R> = Box<dyn FnMut(T, &Subscriber<R>) -> Result<(), RxError>>;
type ErrorHook<R> = Box<dyn FnMut(RxError, &Subscriber<R>) -> Result<(), RxError>>;
type CompleteHook<R> = Box<dyn FnMut(&Subscriber<R>) -> Result<(), RxError>>;

/// Builder for an operator subscriber. See [`operate`].
#[must_use = "call build() to obtain the operator subscriber"]
pub struct Operate<T: 'static, R: 'static> {
    destination: Subscriber<R>,
    next: NextHook<T, R>,
    error: Option<ErrorHook<R>>,
    complete: Option<CompleteHook<R>>,
    finalize: Option<Box<dyn FnOnce()>>,
}

/// Start an operator subscriber whose `next` forwards values unchanged.
pub fn operate<T: 'static>(destination: &Subscriber<T>) -> Operate<T, T> {
    operate_with(destination, |value, destination: &Subscriber<T>| {
        destination.next(value);
        Ok(())
    })
}

/// Start an operator subscriber with an explicit `next` hook.
pub fn operate_with<T: 'static, R: 'static>(
    destination: &Subscriber<R>,
    next: impl FnMut(T, &Subscriber<R>) -> Result<(), RxError> + 'static,
) -> Operate<T, R> {
    Operate {
        destination: destination.clone(),
        next: Box::new(next),
        error: None,
        complete: None,
        finalize: None,
    }
}

impl<T: 'static, R: 'static> Operate<T, R> {
    /// Replace the `next` hook.
    pub fn on_next(
        mut self,
        f: impl FnMut(T, &Subscriber<R>) -> Result<(), RxError> + 'static,
    ) -> Self {
        self.next = Box::new(f);
        self
    }

    /// Intercept `error` instead of forwarding it.
    pub fn on_error(
        mut self,
        f: impl FnMut(RxError, &Subscriber<R>) -> Result<(), RxError> + 'static,
    ) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Intercept `complete` instead of forwarding it.
    pub fn on_complete(
        mut self,
        f: impl FnMut(&Subscriber<R>) -> Result<(), RxError> + 'static,
    ) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    /// Run `f` once when the operator subscriber closes, for any reason.
    pub fn on_finalize(mut self, f: impl FnOnce() + 'static) -> Self {
        self.finalize = Some(Box::new(f));
        self
    }

    /// Create the subscriber and attach it under the destination.
    #[must_use]
    pub fn build(self) -> Subscriber<T> {
        let own = Subscription::new();
        let sink = self.destination.sink().clone();
        let observer = OperatorObserver {
            destination: self.destination.clone(),
            own: own.clone(),
            next: self.next,
            error: self.error,
            complete: self.complete,
        };
        let subscriber = Subscriber::with_subscription(Box::new(observer), own, sink);
        if let Some(finalize) = self.finalize {
            subscriber.add_teardown(finalize);
        }
        self.destination.add(&subscriber.subscription());
        subscriber
    }
}

struct OperatorObserver<T: 'static, R: 'static> {
    destination: Subscriber<R>,
    own: Subscription,
    next: NextHook<T, R>,
    error: Option<ErrorHook<R>>,
    complete: Option<CompleteHook<R>>,
}

impl<T: 'static, R: 'static> OperatorObserver<T, R> {
    fn fail(&self, err: RxError) {
        self.destination.error(err);
        if let Err(err) = self.own.unsubscribe() {
            self.destination
                .sink()
                .report(UnhandledError::Teardown(err));
        }
    }
}

impl<T: 'static, R: 'static> Observer<T> for OperatorObserver<T, R> {
    fn next(&mut self, value: T) -> Result<(), RxError> {
        if let Err(err) = (self.next)(value, &self.destination) {
            self.fail(err);
        }
        Ok(())
    }

    fn error(&mut self, err: RxError) -> Result<(), RxError> {
        let result = match self.error.as_mut() {
            Some(hook) => hook(err, &self.destination),
            None => {
                self.destination.error(err);
                Ok(())
            }
        };
        if let Err(err) = result {
            self.fail(err);
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<(), RxError> {
        let result = match self.complete.as_mut() {
            Some(hook) => hook(&self.destination),
            None => {
                self.destination.complete();
                Ok(())
            }
        };
        if let Err(err) = result {
            self.fail(err);
        }
        Ok(())
    }
}
