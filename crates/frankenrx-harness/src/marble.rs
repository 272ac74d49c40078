#![forbid(unsafe_code)]

//! Marble diagrams: timelines written as strings.
//!
//! # Syntax
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `-` | one frame passes |
//! | `a`..`z`, `0`..`9`, ... | a value, resolved through a lookup |
//! | `\|` | complete |
//! | `#` | error (see [`marble_error`]) |
//! | `(ab)` | group: every signal inside happens in the same frame |
//! | space | ignored, for alignment |
//!
//! Each frame is one virtual tick. A group, like any other single event,
//! takes one frame in total.
//!
//! # Example
//!
//! ```
//! use frankenrx_harness::marble::parse_marbles;
//!
//! let events = parse_marbles("-a-(bc)|", Some).unwrap();
//! let times: Vec<u64> = events.iter().map(|e| e.time.ticks()).collect();
//! assert_eq!(times, vec![1, 3, 3, 4]);
//! ```

use std::fmt;

use frankenrx_core::error::RxError;
use frankenrx_core::notification::Notification;
use frankenrx_core::observable::Observable;
use frankenrx_core::scheduler::{Action, VirtualTime, VirtualTimeScheduler};
use frankenrx_core::subscriber::Subscriber;

use crate::recorder::Recorded;

/// Message carried by the error a `#` produces.
pub const MARBLE_ERROR_MESSAGE: &str = "error";

/// The error a `#` stands for.
#[must_use]
pub fn marble_error() -> RxError {
    RxError::msg(MARBLE_ERROR_MESSAGE)
}

/// A diagram that could not be parsed. Positions count characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarbleError {
    /// `(` inside an open group.
    NestedGroup { position: usize },
    /// `)` without a matching `(`, or `-` inside a group.
    UnexpectedChar { ch: char, position: usize },
    /// The diagram ended inside a group.
    UnclosedGroup { position: usize },
    /// The lookup had no value for this character.
    UnknownValue { ch: char, position: usize },
    /// A signal after `|` or `#`.
    EventAfterTerminal { position: usize },
}

impl fmt::Display for MarbleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NestedGroup { position } => write!(f, "nested group at {position}"),
            Self::UnexpectedChar { ch, position } => {
                write!(f, "unexpected '{ch}' at {position}")
            }
            Self::UnclosedGroup { position } => {
                write!(f, "group opened at {position} is never closed")
            }
            Self::UnknownValue { ch, position } => {
                write!(f, "no value for '{ch}' at {position}")
            }
            Self::EventAfterTerminal { position } => {
                write!(f, "signal after terminal at {position}")
            }
        }
    }
}

impl std::error::Error for MarbleError {}

/// Parse `diagram` into timed signals, resolving value characters with
/// `lookup`. Times are offsets from the start of the diagram.
pub fn parse_marbles<T>(
    diagram: &str,
    lookup: impl Fn(char) -> Option<T>,
) -> Result<Vec<Recorded<T>>, MarbleError> {
    let mut events = Vec::new();
    let mut frame = 0u64;
    let mut group: Option<usize> = None;
    let mut terminated = false;

    for (position, ch) in diagram.chars().enumerate() {
        let notification = match ch {
            ' ' => continue,
            '-' if group.is_none() => {
                frame += 1;
                continue;
            }
            '(' => {
                if group.is_some() {
                    return Err(MarbleError::NestedGroup { position });
                }
                group = Some(position);
                continue;
            }
            ')' if group.is_some() => {
                group = None;
                frame += 1;
                continue;
            }
            '-' | ')' => return Err(MarbleError::UnexpectedChar { ch, position }),
            '|' => Notification::Complete,
            '#' => Notification::Error(marble_error()),
            other => match lookup(other) {
                Some(value) => Notification::Next(value),
                None => return Err(MarbleError::UnknownValue { ch, position }),
            },
        };

        if terminated {
            return Err(MarbleError::EventAfterTerminal { position });
        }
        terminated = notification.is_terminal();
        events.push(Recorded::new(VirtualTime::new(frame), notification));
        if group.is_none() {
            frame += 1;
        }
    }

    if let Some(position) = group {
        return Err(MarbleError::UnclosedGroup { position });
    }
    Ok(events)
}

/// Cold observable replaying `diagram` on `scheduler`.
///
/// Each subscription starts its own copy of the timeline at the scheduler's
/// current time. Nothing is emitted until the scheduler is flushed or
/// advanced.
pub fn cold<T>(
    scheduler: &VirtualTimeScheduler,
    diagram: &str,
    lookup: impl Fn(char) -> Option<T>,
) -> Result<Observable<T>, MarbleError>
where
    T: Clone + 'static,
{
    let events = parse_marbles(diagram, lookup)?;
    let scheduler = scheduler.clone();
    Ok(Observable::new(move |subscriber: Subscriber<T>| {
        for event in &events {
            let target = subscriber.clone();
            subscriber.schedule_on(
                &scheduler,
                move |_: &Action<Notification<T>>, notification: Notification<T>| {
                    match notification {
                        Notification::Next(value) => target.next(value),
                        Notification::Error(err) => target.error(err),
                        Notification::Complete => target.complete(),
                    }
                    Ok(())
                },
                event.time.ticks(),
                event.notification.clone(),
            );
        }
        tracing::trace!(events = events.len(), "marble timeline scheduled");
        Ok(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(diagram: &str) -> Result<Vec<Recorded<char>>, MarbleError> {
        parse_marbles(diagram, Some)
    }

    fn at(time: u64, notification: Notification<char>) -> Recorded<char> {
        Recorded::new(VirtualTime::new(time), notification)
    }

    #[test]
    fn values_and_complete() {
        assert_eq!(
            chars("-a--b|").unwrap(),
            vec![
                at(1, Notification::Next('a')),
                at(4, Notification::Next('b')),
                at(5, Notification::Complete),
            ]
        );
    }

    #[test]
    fn group_shares_one_frame() {
        assert_eq!(
            chars("(ab|)").unwrap(),
            vec![
                at(0, Notification::Next('a')),
                at(0, Notification::Next('b')),
                at(0, Notification::Complete),
            ]
        );
    }

    #[test]
    fn error_marker() {
        assert_eq!(
            chars("--#").unwrap(),
            vec![at(2, Notification::Error(marble_error()))]
        );
    }

    #[test]
    fn spaces_are_ignored() {
        assert_eq!(chars(" -a ").unwrap(), chars("-a").unwrap());
    }

    #[test]
    fn malformed_diagrams() {
        assert_eq!(chars("(a(b))"), Err(MarbleError::NestedGroup { position: 2 }));
        assert_eq!(chars("a)"), Err(MarbleError::UnexpectedChar { ch: ')', position: 1 }));
        assert_eq!(chars("(a-b)"), Err(MarbleError::UnexpectedChar { ch: '-', position: 2 }));
        assert_eq!(chars("-(ab"), Err(MarbleError::UnclosedGroup { position: 1 }));
        assert_eq!(chars("|a"), Err(MarbleError::EventAfterTerminal { position: 1 }));
        assert_eq!(
            parse_marbles("-x", |c| c.to_digit(10)),
            Err(MarbleError::UnknownValue { ch: 'x', position: 1 })
        );
    }

    #[test]
    fn cold_replays_per_subscription() {
        let scheduler = VirtualTimeScheduler::new();
        let source = cold(&scheduler, "-a-b|", Some).unwrap();

        let first = crate::Recorder::on(&scheduler);
        source.subscribe(first.observer());
        scheduler.advance_to(VirtualTime::new(2));

        let second = crate::Recorder::on(&scheduler);
        source.subscribe(second.observer());
        scheduler.flush();

        let times = |r: &crate::Recorder<char>| -> Vec<u64> {
            r.events().iter().map(|e| e.time.ticks()).collect()
        };
        assert_eq!(times(&first), vec![1, 3, 4]);
        assert_eq!(times(&second), vec![3, 5, 6]);
        assert_eq!(second.values(), vec!['a', 'b']);
    }

    #[test]
    fn unsubscribing_cancels_remaining_timeline() {
        let scheduler = VirtualTimeScheduler::new();
        let source = cold(&scheduler, "a-b-c|", Some).unwrap();
        let recorder = crate::Recorder::on(&scheduler);
        let sub = source.subscribe(recorder.observer());

        scheduler.advance_to(VirtualTime::new(1));
        sub.unsubscribe().unwrap();
        assert_eq!(scheduler.pending(), 0);
        scheduler.flush();
        assert_eq!(recorder.values(), vec!['a']);
    }
}
