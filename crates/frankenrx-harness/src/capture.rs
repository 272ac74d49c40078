#![forbid(unsafe_code)]

//! Error sink that keeps what it is given.

use std::cell::RefCell;
use std::rc::Rc;

use frankenrx_core::error::{ErrorSink, UnhandledError};

/// Collects every [`UnhandledError`] reported through its sink.
///
/// Cloning shares the same report buffer.
#[derive(Debug, Clone, Default)]
pub struct ErrorCapture {
    reports: Rc<RefCell<Vec<UnhandledError>>>,
}

impl ErrorCapture {
    /// Empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that appends to this capture.
    #[must_use]
    pub fn sink(&self) -> ErrorSink {
        let reports = Rc::clone(&self.reports);
        ErrorSink::new(move |err| {
            tracing::debug!(error = %err, "captured unhandled error");
            reports.borrow_mut().push(err);
        })
    }

    /// Snapshot of everything reported so far.
    #[must_use]
    pub fn reports(&self) -> Vec<UnhandledError> {
        self.reports.borrow().clone()
    }

    /// Drain the buffer.
    pub fn take(&self) -> Vec<UnhandledError> {
        std::mem::take(&mut *self.reports.borrow_mut())
    }

    /// Whether nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }

    /// Number of reports held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frankenrx_core::error::RxError;

    #[test]
    fn sink_reports_land_in_capture() {
        let capture = ErrorCapture::new();
        let sink = capture.sink();
        sink.report(UnhandledError::Signal(RxError::msg("one")));
        capture
            .clone()
            .sink()
            .report(UnhandledError::Work(RxError::msg("two")));

        assert_eq!(capture.len(), 2);
        assert_eq!(
            capture.take(),
            vec![
                UnhandledError::Signal(RxError::msg("one")),
                UnhandledError::Work(RxError::msg("two")),
            ]
        );
        assert!(capture.is_empty());
    }
}
