#![forbid(unsafe_code)]

//! Error types and the unhandled-error channel.
//!
//! Faults never unwind through the engine. Every fallible hook returns
//! `Result<_, RxError>` and the engine routes the failure to exactly one
//! place: a consumer's `error` hook, or the [`ErrorSink`] when no consumer
//! is left to notify.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Consumer hook fails | `next`/`complete` returned `Err` | [`UnhandledError::Signal`] |
//! | Producer fails after terminal | subscribe procedure `Err` on a stopped subscriber | [`UnhandledError::Producer`] |
//! | Error without a handler | consumer has no `error` hook | [`UnhandledError::Unobserved`] |
//! | Teardown fails on implicit close | close after `error`/`complete` | [`UnhandledError::Teardown`] |
//! | Scheduled work fails | work function returned `Err` | [`UnhandledError::Work`] |

use std::fmt;
use std::rc::Rc;

/// Error payload carried on the `error` channel of a stream.
///
/// Cloning is cheap; all clones share the same underlying error value.
#[derive(Clone)]
pub struct RxError {
    inner: Rc<dyn std::error::Error + 'static>,
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

impl RxError {
    /// Wrap any error value.
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self {
            inner: Rc::new(err),
        }
    }

    /// Build an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Borrow the wrapped error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// True when both handles point at the same error value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RxError").field(&self.inner.to_string()).finish()
    }
}

impl fmt::Display for RxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for RxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Two errors are equal when they are the same value or render identically.
impl PartialEq for RxError {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.to_string() == other.to_string()
    }
}

impl From<&str> for RxError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

impl From<String> for RxError {
    fn from(message: String) -> Self {
        Self::msg(message)
    }
}

/// Every teardown failure collected by one `unsubscribe()` call.
///
/// Failures from nested subscriptions are flattened into this list, in the
/// order the teardowns ran.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsubscriptionError {
    errors: Vec<RxError>,
}

impl UnsubscriptionError {
    pub(crate) fn new(errors: Vec<RxError>) -> Self {
        Self { errors }
    }

    /// The individual failures.
    #[must_use]
    pub fn errors(&self) -> &[RxError] {
        &self.errors
    }

    /// Consume into the individual failures.
    #[must_use]
    pub fn into_errors(self) -> Vec<RxError> {
        self.errors
    }
}

impl fmt::Display for UnsubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s) occurred during unsubscription",
            self.errors.len()
        )?;
        for (idx, err) in self.errors.iter().enumerate() {
            write!(f, "\n{}) {err}", idx + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for UnsubscriptionError {}

/// A fault with nobody left to deliver it to.
#[derive(Debug, Clone, PartialEq)]
pub enum UnhandledError {
    /// A consumer's own `next` or `complete` hook failed.
    Signal(RxError),
    /// A producer failed after its consumer already reached a terminal state.
    Producer(RxError),
    /// An `error` reached a consumer that has no `error` hook, or whose
    /// `error` hook itself failed.
    Unobserved(RxError),
    /// Teardowns failed while a subscription closed itself.
    Teardown(UnsubscriptionError),
    /// Scheduled work returned an error.
    Work(RxError),
}

impl fmt::Display for UnhandledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(err) => write!(f, "consumer hook failed: {err}"),
            Self::Producer(err) => write!(f, "producer failed after termination: {err}"),
            Self::Unobserved(err) => write!(f, "unobserved stream error: {err}"),
            Self::Teardown(err) => write!(f, "teardown failed: {err}"),
            Self::Work(err) => write!(f, "scheduled work failed: {err}"),
        }
    }
}

impl std::error::Error for UnhandledError {}

/// The unhandled-error channel.
///
/// Passed explicitly to subscribers and schedulers so that tests can capture
/// reports deterministically. The default sink logs through `tracing`.
#[derive(Clone)]
pub struct ErrorSink {
    report: Rc<dyn Fn(UnhandledError)>,
}

impl ErrorSink {
    /// Build a sink from a reporting callback.
    pub fn new(report: impl Fn(UnhandledError) + 'static) -> Self {
        Self {
            report: Rc::new(report),
        }
    }

    /// Sink that logs every report at error level.
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(|err| tracing::error!(error = %err, "unhandled stream error"))
    }

    /// Sink that discards every report.
    #[must_use]
    pub fn ignore() -> Self {
        Self::new(|_| {})
    }

    /// Deliver one report.
    pub fn report(&self, err: UnhandledError) {
        (self.report)(err);
    }
}

impl Default for ErrorSink {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSink").finish_non_exhaustive()
    }
}
