#![forbid(unsafe_code)]

//! Observer that records signals with their arrival time.

use std::cell::RefCell;
use std::rc::Rc;

use frankenrx_core::error::RxError;
use frankenrx_core::notification::Notification;
use frankenrx_core::observer::Observer;
use frankenrx_core::scheduler::{Scheduler, VirtualTime, VirtualTimeScheduler};

/// One signal and the virtual time it arrived at.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded<T> {
    /// Scheduler time at delivery.
    pub time: VirtualTime,
    /// The signal itself.
    pub notification: Notification<T>,
}

impl<T> Recorded<T> {
    /// Pair a signal with its time.
    #[must_use]
    pub fn new(time: VirtualTime, notification: Notification<T>) -> Self {
        Self { time, notification }
    }
}

/// Shared log of received signals.
///
/// Hand out observers with [`observer`](Self::observer); every observer from
/// the same recorder appends to the same log. Errors are recorded, never
/// reported as unobserved.
#[derive(Debug)]
pub struct Recorder<T> {
    clock: Option<VirtualTimeScheduler>,
    log: Rc<RefCell<Vec<Recorded<T>>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            clock: self.clock.clone(),
            log: Rc::clone(&self.log),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Recorder<T> {
    /// Recorder that stamps every signal with time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: None,
            log: Rc::default(),
        }
    }

    /// Recorder that stamps signals with `scheduler`'s clock.
    #[must_use]
    pub fn on(scheduler: &VirtualTimeScheduler) -> Self {
        Self {
            clock: Some(scheduler.clone()),
            log: Rc::default(),
        }
    }

    /// A fresh observer writing into this recorder.
    #[must_use]
    pub fn observer(&self) -> RecordingObserver<T> {
        RecordingObserver {
            recorder: self.clone(),
        }
    }

    fn push(&self, notification: Notification<T>) {
        let time = self.clock.as_ref().map_or(VirtualTime::ZERO, |s| s.now());
        self.log.borrow_mut().push(Recorded { time, notification });
    }

    /// Whether an `error` or `complete` has been recorded.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.log
            .borrow()
            .iter()
            .any(|r| r.notification.is_terminal())
    }
}

impl<T: Clone> Recorder<T> {
    /// Every recorded signal with its time.
    #[must_use]
    pub fn events(&self) -> Vec<Recorded<T>> {
        self.log.borrow().clone()
    }

    /// Recorded signals without times.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification<T>> {
        self.log
            .borrow()
            .iter()
            .map(|r| r.notification.clone())
            .collect()
    }

    /// Just the `next` values, in order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.log
            .borrow()
            .iter()
            .filter_map(|r| match &r.notification {
                Notification::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Observer half of a [`Recorder`].
#[derive(Debug)]
pub struct RecordingObserver<T> {
    recorder: Recorder<T>,
}

impl<T> Observer<T> for RecordingObserver<T> {
    fn next(&mut self, value: T) -> Result<(), RxError> {
        self.recorder.push(Notification::Next(value));
        Ok(())
    }

    fn error(&mut self, err: RxError) -> Result<(), RxError> {
        self.recorder.push(Notification::Error(err));
        Ok(())
    }

    fn complete(&mut self) -> Result<(), RxError> {
        self.recorder.push(Notification::Complete);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frankenrx_core::observable::Observable;

    #[test]
    fn records_values_and_terminal() {
        let recorder = Recorder::new();
        Observable::from_iter(vec![1, 2]).subscribe(recorder.observer());

        assert_eq!(recorder.values(), vec![1, 2]);
        assert!(recorder.is_terminated());
        assert_eq!(
            recorder.notifications(),
            vec![
                Notification::Next(1),
                Notification::Next(2),
                Notification::Complete
            ]
        );
    }

    #[test]
    fn stamps_with_scheduler_time() {
        let scheduler = VirtualTimeScheduler::new();
        let recorder = Recorder::on(&scheduler);
        Observable::interval(4, scheduler.clone()).subscribe(recorder.observer());
        scheduler.advance_to(VirtualTime::new(9));

        let times: Vec<u64> = recorder.events().iter().map(|r| r.time.ticks()).collect();
        assert_eq!(times, vec![4, 8]);
        assert_eq!(recorder.values(), vec![0, 1]);
    }
}
