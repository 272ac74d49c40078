#![forbid(unsafe_code)]

//! Signals as values.

use crate::error::RxError;
use crate::observer::Observer;

/// One signal delivered to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<T> {
    /// A value.
    Next(T),
    /// Terminal failure.
    Error(RxError),
    /// Terminal success.
    Complete,
}

impl<T> Notification<T> {
    /// Whether this signal ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }

    /// Deliver this signal to an observer.
    pub fn accept<O>(self, observer: &mut O) -> Result<(), RxError>
    where
        O: Observer<T> + ?Sized,
    {
        match self {
            Self::Next(value) => observer.next(value),
            Self::Error(err) => observer.error(err),
            Self::Complete => observer.complete(),
        }
    }

    /// Map the carried value, keeping terminal signals as they are.
    pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Notification<R> {
        match self {
            Self::Next(value) => Notification::Next(f(value)),
            Self::Error(err) => Notification::Error(err),
            Self::Complete => Notification::Complete,
        }
    }
}
