#![forbid(unsafe_code)]

//! Emit a fallback value when the source completes empty.

use std::cell::Cell;
use std::rc::Rc;

use crate::observable::Observable;
use crate::operate::operate;
use crate::subscriber::Subscriber;

/// Per-subscription progress of [`default_if_empty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmptyState {
    AwaitingFirstValue,
    HasValue,
    EmittedDefault,
}

/// Mirror the source, or emit `default_value` if it completes without
/// emitting anything.
///
/// Errors pass through unchanged and never trigger the default.
///
/// ```
/// use frankenrx_core::prelude::*;
/// use frankenrx_core::operators::default_if_empty;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// Observable::<i32>::empty()
///     .pipe(default_if_empty(5))
///     .subscribe(move |v: i32| sink.borrow_mut().push(v));
/// assert_eq!(*seen.borrow(), vec![5]);
/// ```
pub fn default_if_empty<T>(default_value: T) -> impl FnOnce(Observable<T>) -> Observable<T>
where
    T: Clone + 'static,
{
    move |source| {
        Observable::new(move |destination: Subscriber<T>| {
            let state = Rc::new(Cell::new(EmptyState::AwaitingFirstValue));
            let next_state = Rc::clone(&state);
            let default_value = default_value.clone();

            let upstream = operate(&destination)
                .on_next(move |value, destination| {
                    next_state.set(EmptyState::HasValue);
                    destination.next(value);
                    Ok(())
                })
                .on_complete(move |destination| {
                    if state.get() == EmptyState::AwaitingFirstValue {
                        state.set(EmptyState::EmittedDefault);
                        destination.next(default_value.clone());
                    }
                    destination.complete();
                    Ok(())
                })
                .build();

            Ok(source.subscribe_subscriber(upstream))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorSink, RxError};
    use crate::notification::Notification;
    use crate::observer::FnObserver;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<Notification<i32>>>>;

    fn recorder(log: &Log) -> FnObserver<i32> {
        let (a, b, c) = (Rc::clone(log), Rc::clone(log), Rc::clone(log));
        FnObserver::new()
            .on_next(move |v: i32| a.borrow_mut().push(Notification::Next(v)))
            .on_error(move |e| b.borrow_mut().push(Notification::Error(e)))
            .on_complete(move || c.borrow_mut().push(Notification::Complete))
    }

    fn run(source: Observable<i32>) -> Vec<Notification<i32>> {
        let log = Log::default();
        source
            .pipe(default_if_empty(5))
            .subscribe_with(recorder(&log), ErrorSink::ignore());
        let out = log.borrow().clone();
        out
    }

    #[test]
    fn empty_source_emits_default_then_completes() {
        assert_eq!(
            run(Observable::empty()),
            vec![Notification::Next(5), Notification::Complete]
        );
    }

    #[test]
    fn non_empty_source_is_mirrored() {
        assert_eq!(
            run(Observable::from_iter(vec![1, 2, 3])),
            vec![
                Notification::Next(1),
                Notification::Next(2),
                Notification::Next(3),
                Notification::Complete,
            ]
        );
    }

    #[test]
    fn error_passes_through_without_default() {
        assert_eq!(
            run(Observable::throw_error(|| RxError::msg("e"))),
            vec![Notification::Error(RxError::msg("e"))]
        );
    }

    #[test]
    fn error_after_values_passes_through() {
        let source = Observable::new(|s: Subscriber<i32>| {
            s.next(1);
            s.error(RxError::msg("late"));
            Ok(())
        });
        assert_eq!(
            run(source),
            vec![Notification::Next(1), Notification::Error(RxError::msg("late"))]
        );
    }

    #[test]
    fn each_subscription_has_its_own_state() {
        let flip = Rc::new(Cell::new(false));
        let flip_clone = Rc::clone(&flip);
        let source = Observable::new(move |s: Subscriber<i32>| {
            if flip_clone.replace(!flip_clone.get()) {
                s.next(9);
            }
            s.complete();
            Ok(())
        })
        .pipe(default_if_empty(0));

        let log = Log::default();
        source.subscribe_with(recorder(&log), ErrorSink::ignore());
        source.subscribe_with(recorder(&log), ErrorSink::ignore());
        source.subscribe_with(recorder(&log), ErrorSink::ignore());
        assert_eq!(
            *log.borrow(),
            vec![
                Notification::Next(0),
                Notification::Complete,
                Notification::Next(9),
                Notification::Complete,
                Notification::Next(0),
                Notification::Complete,
            ]
        );
    }

    #[test]
    fn unsubscribing_downstream_tears_down_source() {
        let torn_down = Rc::new(Cell::new(false));
        let flag = Rc::clone(&torn_down);
        let source = Observable::new(move |s: Subscriber<i32>| {
            let flag = Rc::clone(&flag);
            s.add_teardown(move || flag.set(true));
            Ok(())
        });

        let log = Log::default();
        let sub = source
            .pipe(default_if_empty(1))
            .subscribe_with(recorder(&log), ErrorSink::ignore());
        assert!(!torn_down.get());

        sub.unsubscribe().unwrap();
        assert!(torn_down.get());
        assert!(log.borrow().is_empty());
    }
}
