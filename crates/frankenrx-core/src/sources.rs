#![forbid(unsafe_code)]

//! Creation functions.

use crate::error::RxError;
use crate::observable::Observable;
use crate::scheduler::{Action, Scheduler};
use crate::subscriber::Subscriber;

impl<T: 'static> Observable<T> {
    /// Completes immediately without emitting.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(|subscriber: Subscriber<T>| {
            subscriber.complete();
            Ok(())
        })
    }

    /// Never emits and never terminates.
    #[must_use]
    pub fn never() -> Self {
        Self::new(|_: Subscriber<T>| Ok(()))
    }

    /// Errors immediately with a fresh error from `factory`.
    pub fn throw_error(factory: impl Fn() -> RxError + 'static) -> Self {
        Self::new(move |subscriber: Subscriber<T>| {
            subscriber.error(factory());
            Ok(())
        })
    }

    /// Emits every item synchronously, then completes.
    ///
    /// Stops early if the subscriber closes while emitting.
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + 'static,
    {
        Self::new(move |subscriber: Subscriber<T>| {
            for item in items.clone() {
                if subscriber.is_closed() {
                    return Ok(());
                }
                subscriber.next(item);
            }
            subscriber.complete();
            Ok(())
        })
    }

    /// Emits one item per scheduler action, then completes.
    ///
    /// The action reschedules itself for each item, so a long iterator does
    /// not grow the stack.
    pub fn scheduled<I, S>(items: I, scheduler: S) -> Self
    where
        I: IntoIterator<Item = T> + Clone + 'static,
        I::IntoIter: 'static,
        S: Scheduler + 'static,
    {
        Self::new(move |subscriber: Subscriber<T>| {
            let target = subscriber.clone();
            subscriber.schedule_on(
                &scheduler,
                move |action: &Action<I::IntoIter>, mut iter: I::IntoIter| {
                    match iter.next() {
                        Some(item) => {
                            target.next(item);
                            action.schedule(iter, 0);
                        }
                        None => target.complete(),
                    }
                    Ok(())
                },
                0,
                items.clone().into_iter(),
            );
            Ok(())
        })
    }
}

impl Observable<u64> {
    /// Emits `0, 1, 2, ...` every `period` ticks, forever.
    ///
    /// On a [`QueueScheduler`](crate::scheduler::QueueScheduler) this runs
    /// synchronously until the subscriber unsubscribes.
    pub fn interval<S>(period: u64, scheduler: S) -> Self
    where
        S: Scheduler + 'static,
    {
        Self::new(move |subscriber: Subscriber<u64>| {
            let target = subscriber.clone();
            subscriber.schedule_on(
                &scheduler,
                move |action: &Action<u64>, n: u64| {
                    target.next(n);
                    action.schedule(n + 1, period);
                    Ok(())
                },
                period,
                0,
            );
            Ok(())
        })
    }
}
