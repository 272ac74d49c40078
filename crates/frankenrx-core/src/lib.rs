#![forbid(unsafe_code)]

//! Core: lazy push-based event streams, cancellation, and scheduling.
//!
//! # Role in FrankenRx
//! `frankenrx-core` is the whole engine. Everything else in the workspace
//! (the test harness, marble diagrams) is built on the types defined here.
//!
//! # Primary responsibilities
//! - **Subscription**: idempotent teardown trees with parent detach.
//! - **Scheduler**: virtual-time and trampoline queues driving [`Action`]s.
//! - **Observable / Subscriber**: cold producers and protocol enforcement
//!   for consumers (one terminal signal, nothing after close).
//! - **operate**: the builder every operator uses to sit between a source
//!   and its destination.
//! - **Operators**: [`default_if_empty`](operators::default_if_empty).
//!
//! # Execution model
//! All state is single-threaded (`Rc`/`RefCell`). Faults travel as
//! [`RxError`] values: a fault either reaches a consumer's error path or is
//! reported to an [`ErrorSink`], which logs through `tracing` by default.
//!
//! [`Action`]: scheduler::Action
//! [`RxError`]: error::RxError
//! [`ErrorSink`]: error::ErrorSink

pub mod config;
pub mod error;
pub mod notification;
pub mod observable;
pub mod observer;
pub mod operate;
pub mod operators;
pub mod scheduler;
mod sources;
pub mod subscriber;
pub mod subscription;

/// Everything needed to build and consume streams.
pub mod prelude {
    pub use crate::config::SchedulerConfig;
    pub use crate::error::{ErrorSink, RxError, UnhandledError, UnsubscriptionError};
    pub use crate::notification::Notification;
    pub use crate::observable::{Observable, TeardownLogic};
    pub use crate::observer::{FnObserver, Observer};
    pub use crate::operate::{operate, operate_with};
    pub use crate::operators::default_if_empty;
    pub use crate::scheduler::{
        Action, QueueScheduler, Scheduler, VirtualTime, VirtualTimeScheduler,
    };
    pub use crate::subscriber::Subscriber;
    pub use crate::subscription::{Subscription, SubscriptionGuard};
}
