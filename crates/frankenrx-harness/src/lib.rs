#![forbid(unsafe_code)]

//! Deterministic fixtures for FrankenRx tests.
//!
//! # Role in FrankenRx
//! `frankenrx-harness` is test-only support. It never appears in the
//! dependency graph of production code.
//!
//! # Primary responsibilities
//! - **Recorder**: an observer that logs every signal with the virtual time
//!   it arrived at.
//! - **ErrorCapture**: an error sink that keeps reports for assertions.
//! - **Marble diagrams**: a parser for `"-a-b-|"` style timelines and a cold
//!   observable that replays one on a virtual-time scheduler.
//! - **init_tracing**: one-call log setup for test binaries.

pub mod capture;
pub mod logging;
pub mod marble;
pub mod recorder;

pub use capture::ErrorCapture;
pub use logging::init_tracing;
pub use marble::{MarbleError, cold, parse_marbles};
pub use recorder::{Recorded, Recorder};
