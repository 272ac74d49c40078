//! Property-based invariant tests for `default_if_empty`.
//!
//! 1. An empty source yields exactly the default, then completion.
//! 2. A non-empty source is mirrored exactly; the default never appears.
//! 3. At most one default is emitted per subscription.
//! 4. An error terminates the stream without a default.
//! 5. The operator behaves the same on a virtual-time scheduler.

use frankenrx_core::prelude::*;
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

const DEFAULT: i64 = i64::MIN;

fn run(source: Observable<i64>) -> Vec<Notification<i64>> {
    let log: Rc<RefCell<Vec<Notification<i64>>>> = Rc::default();
    let (a, b, c) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
    source.pipe(default_if_empty(DEFAULT)).subscribe_with(
        FnObserver::new()
            .on_next(move |v: i64| a.borrow_mut().push(Notification::Next(v)))
            .on_error(move |e| b.borrow_mut().push(Notification::Error(e)))
            .on_complete(move || c.borrow_mut().push(Notification::Complete)),
        ErrorSink::ignore(),
    );
    let out = log.borrow().clone();
    out
}

fn values_strategy() -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(-1_000i64..1_000, 0..64)
}

proptest! {
    #[test]
    fn default_appears_iff_source_is_empty(values in values_strategy()) {
        let out = run(Observable::from_iter(values.clone()));

        let mut expected: Vec<Notification<i64>> = if values.is_empty() {
            vec![Notification::Next(DEFAULT)]
        } else {
            values.iter().copied().map(Notification::Next).collect()
        };
        expected.push(Notification::Complete);
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn at_most_one_default(values in values_strategy()) {
        let out = run(Observable::from_iter(values));
        let defaults = out
            .iter()
            .filter(|n| **n == Notification::Next(DEFAULT))
            .count();
        prop_assert!(defaults <= 1);
        prop_assert_eq!(out.iter().filter(|n| n.is_terminal()).count(), 1);
    }

    #[test]
    fn error_never_triggers_default(values in values_strategy()) {
        let emitted = values.clone();
        let source = Observable::new(move |s: Subscriber<i64>| {
            for v in emitted.iter().copied() {
                s.next(v);
            }
            s.error(RxError::msg("fail"));
            Ok(())
        });

        let out = run(source);
        prop_assert_eq!(out.len(), values.len() + 1);
        prop_assert!(!out.contains(&Notification::Next(DEFAULT)));
        prop_assert_eq!(out.last(), Some(&Notification::Error(RxError::msg("fail"))));
    }

    #[test]
    fn scheduled_source_matches_synchronous(values in values_strategy()) {
        let scheduler = VirtualTimeScheduler::new();
        let log: Rc<RefCell<Vec<Notification<i64>>>> = Rc::default();
        let (a, c) = (Rc::clone(&log), Rc::clone(&log));
        Observable::scheduled(values.clone(), scheduler.clone())
            .pipe(default_if_empty(DEFAULT))
            .subscribe(
                FnObserver::new()
                    .on_next(move |v: i64| a.borrow_mut().push(Notification::Next(v)))
                    .on_complete(move || c.borrow_mut().push(Notification::Complete)),
            );
        scheduler.flush();

        prop_assert_eq!(&*log.borrow(), &run(Observable::from_iter(values)));
    }
}
