#![forbid(unsafe_code)]

//! Stream transformations.
//!
//! Every operator is a plain function value `Observable<T> -> Observable<R>`
//! that composes through [`Observable::pipe`](crate::observable::Observable::pipe).
//! Each one follows the same template: subscribe to the source with an
//! operator subscriber from [`operate`](crate::operate::operate), keep the
//! minimum per-subscription state, intercept the signals it cares about, and
//! forward the rest unchanged.

mod default_if_empty;

pub use default_if_empty::default_if_empty;
