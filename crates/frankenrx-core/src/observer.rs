#![forbid(unsafe_code)]

//! The raw consumer capability set.
//!
//! An [`Observer`] has three hooks, each optional: omitted `next` and
//! `complete` hooks do nothing, and an omitted `error` hook hands the error
//! back so the engine reports it as unobserved. A hook that returns `Err`
//! has failed; the engine reports the failure to the error sink since the
//! consumer itself is the failure point.
//!
//! Observers never see the terminal-state protocol directly. They are always
//! driven through a [`Subscriber`](crate::subscriber::Subscriber), which
//! guarantees at most one terminal signal and nothing after it.

use crate::error::RxError;

/// Consumer of `next`/`error`/`complete` signals.
pub trait Observer<T> {
    /// Receive a value.
    fn next(&mut self, _value: T) -> Result<(), RxError> {
        Ok(())
    }

    /// Receive a terminal failure.
    fn error(&mut self, err: RxError) -> Result<(), RxError> {
        Err(err)
    }

    /// Receive terminal success.
    fn complete(&mut self) -> Result<(), RxError> {
        Ok(())
    }
}

/// Any `FnMut(T)` observes values only.
impl<T, F> Observer<T> for F
where
    F: FnMut(T),
{
    fn next(&mut self, value: T) -> Result<(), RxError> {
        self(value);
        Ok(())
    }
}

type NextFn<T> = Box<dyn FnMut(T) -> Result<(), RxError>>;
type ErrorFn = Box<dyn FnMut(RxError) -> Result<(), RxError>>;
type CompleteFn = Box<dyn FnMut() -> Result<(), RxError>>;

/// Observer assembled from closures.
///
/// ```
/// use frankenrx_core::observer::{FnObserver, Observer};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// let mut observer = FnObserver::new().on_next(move |v: i32| sink.borrow_mut().push(v));
/// observer.next(1).unwrap();
/// assert_eq!(*seen.borrow(), vec![1]);
/// ```
pub struct FnObserver<T> {
    next: Option<NextFn<T>>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
}

impl<T> Default for FnObserver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FnObserver<T> {
    /// Observer with no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: None,
            error: None,
            complete: None,
        }
    }

    /// Handle values.
    #[must_use]
    pub fn on_next(self, mut f: impl FnMut(T) + 'static) -> Self {
        self.try_on_next(move |value| {
            f(value);
            Ok(())
        })
    }

    /// Handle values with a hook that may fail.
    #[must_use]
    pub fn try_on_next(mut self, f: impl FnMut(T) -> Result<(), RxError> + 'static) -> Self {
        self.next = Some(Box::new(f));
        self
    }

    /// Handle a terminal failure.
    #[must_use]
    pub fn on_error(mut self, mut f: impl FnMut(RxError) + 'static) -> Self {
        self.error = Some(Box::new(move |err| {
            f(err);
            Ok(())
        }));
        self
    }

    /// Handle terminal success.
    #[must_use]
    pub fn on_complete(self, mut f: impl FnMut() + 'static) -> Self {
        self.try_on_complete(move || {
            f();
            Ok(())
        })
    }

    /// Handle terminal success with a hook that may fail.
    #[must_use]
    pub fn try_on_complete(mut self, f: impl FnMut() -> Result<(), RxError> + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }
}

impl<T> Observer<T> for FnObserver<T> {
    fn next(&mut self, value: T) -> Result<(), RxError> {
        match self.next.as_mut() {
            Some(f) => f(value),
            None => Ok(()),
        }
    }

    fn error(&mut self, err: RxError) -> Result<(), RxError> {
        match self.error.as_mut() {
            Some(f) => f(err),
            None => Err(err),
        }
    }

    fn complete(&mut self) -> Result<(), RxError> {
        match self.complete.as_mut() {
            Some(f) => f(),
            None => Ok(()),
        }
    }
}

impl<T> std::fmt::Debug for FnObserver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnObserver")
            .field("next", &self.next.is_some())
            .field("error", &self.error.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn missing_error_hook_hands_error_back() {
        let mut observer = FnObserver::<u8>::new();
        let err = observer.error(RxError::msg("boom")).unwrap_err();
        assert_eq!(err, RxError::msg("boom"));
        assert!(observer.next(1).is_ok());
        assert!(observer.complete().is_ok());
    }

    #[test]
    fn hooks_are_dispatched() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let mut observer = FnObserver::new()
            .on_next(move |v: u8| a.borrow_mut().push(format!("next {v}")))
            .on_error(move |e| b.borrow_mut().push(format!("error {e}")))
            .on_complete(move || c.borrow_mut().push("complete".to_string()));

        observer.next(3).unwrap();
        observer.error(RxError::msg("x")).unwrap();
        observer.complete().unwrap();
        assert_eq!(*log.borrow(), vec!["next 3", "error x", "complete"]);
    }

    #[test]
    fn closures_are_value_observers() {
        let mut total = 0;
        {
            let mut add = |v: i32| total += v;
            Observer::next(&mut add, 4).unwrap();
            Observer::next(&mut add, 5).unwrap();
            assert!(Observer::<i32>::error(&mut add, RxError::msg("e")).is_err());
        }
        assert_eq!(total, 9);
    }
}
