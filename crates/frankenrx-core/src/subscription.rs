#![forbid(unsafe_code)]

//! Composable, idempotent teardown handles.
//!
//! # Design
//!
//! A [`Subscription`] is a shared handle (`Rc`) to a disposal node holding a
//! monotonic closed flag and an ordered list of teardowns: plain callbacks or
//! child subscriptions. Closing a node runs every teardown exactly once, in
//! registration order, and closes every child.
//!
//! Children keep `Weak` back-references to their parents. A child that closes
//! on its own detaches itself from every parent, so long-lived parents do not
//! accumulate dead children.
//!
//! # Invariants
//!
//! 1. The closed flag goes `false -> true` once and never back.
//! 2. Each registered teardown runs at most once.
//! 3. `unsubscribe()` from inside one of the node's own teardowns returns
//!    immediately and runs nothing.
//! 4. The teardown graph is a tree: adding a node to itself, or adding one of
//!    its ancestors, is ignored.
//! 5. A teardown failure never stops the rest of the chain; all failures are
//!    returned together once the chain is done.
//!
//! # Failure Modes
//!
//! - **Adding to a closed node**: the teardown runs immediately and any
//!   failure is returned from the `add*` call.
//! - **Dropping handles**: dropping a `Subscription` does not close it. Use
//!   [`Subscription::into_guard`] for scope-bound disposal.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{RxError, UnsubscriptionError};

type TeardownFn = Box<dyn FnOnce() -> Result<(), RxError>>;

/// Handle for a callback registered with [`Subscription::add_teardown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeardownId(u64);

enum Teardown {
    Callback(TeardownId, TeardownFn),
    Child(Subscription),
}

struct SubscriptionInner {
    closed: Cell<bool>,
    next_id: Cell<u64>,
    teardowns: RefCell<Vec<Teardown>>,
    parents: RefCell<Vec<Weak<SubscriptionInner>>>,
}

/// A disposal node. Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription {
    /// Create an open subscription with no teardowns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                closed: Cell::new(false),
                next_id: Cell::new(0),
                teardowns: RefCell::new(Vec::new()),
                parents: RefCell::new(Vec::new()),
            }),
        }
    }

    /// A subscription that is already closed.
    ///
    /// Anything added to it runs immediately.
    #[must_use]
    pub fn closed() -> Self {
        let sub = Self::new();
        sub.inner.closed.set(true);
        sub
    }

    /// Whether `unsubscribe()` has started on this node.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// True when both handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of teardowns still registered.
    #[must_use]
    pub fn teardown_count(&self) -> usize {
        self.inner.teardowns.borrow().len()
    }

    /// Register an infallible callback to run on close.
    ///
    /// If the node is already closed the callback runs right away.
    pub fn add_teardown(&self, teardown: impl FnOnce() + 'static) -> TeardownId {
        let id = self.fresh_id();
        if self.is_closed() {
            teardown();
        } else {
            self.inner.teardowns.borrow_mut().push(Teardown::Callback(
                id,
                Box::new(move || {
                    teardown();
                    Ok(())
                }),
            ));
        }
        id
    }

    /// Register a callback that may fail.
    ///
    /// If the node is already closed the callback runs right away and its
    /// failure is returned.
    pub fn add_fallible(
        &self,
        teardown: impl FnOnce() -> Result<(), RxError> + 'static,
    ) -> Result<TeardownId, UnsubscriptionError> {
        let id = self.fresh_id();
        if self.is_closed() {
            teardown().map_err(|err| UnsubscriptionError::new(vec![err]))?;
        } else {
            self.inner
                .teardowns
                .borrow_mut()
                .push(Teardown::Callback(id, Box::new(teardown)));
        }
        Ok(id)
    }

    /// Make `child` close when this node closes.
    ///
    /// Ignored when `child` is this node, one of its ancestors, already
    /// closed, or already a child. If this node is closed, `child` is closed
    /// immediately.
    pub fn add(&self, child: &Subscription) -> Result<(), UnsubscriptionError> {
        if self.ptr_eq(child) {
            tracing::debug!("ignoring subscription added to itself");
            return Ok(());
        }
        if child.is_closed() || child.has_parent(&self.inner) {
            return Ok(());
        }
        if self.has_ancestor(&child.inner) {
            tracing::debug!("ignoring subscription add that would form a cycle");
            return Ok(());
        }
        if self.is_closed() {
            return child.unsubscribe();
        }
        child
            .inner
            .parents
            .borrow_mut()
            .push(Rc::downgrade(&self.inner));
        self.inner
            .teardowns
            .borrow_mut()
            .push(Teardown::Child(child.clone()));
        Ok(())
    }

    /// Detach a child before closure so it will not be closed by this node.
    pub fn remove(&self, child: &Subscription) {
        self.detach_child(&child.inner);
        child.detach_parent(&self.inner);
    }

    /// Detach a callback before closure so it will not run.
    pub fn remove_teardown(&self, id: TeardownId) {
        self.inner
            .teardowns
            .borrow_mut()
            .retain(|t| !matches!(t, Teardown::Callback(tid, _) if *tid == id));
    }

    /// Close this node and run every teardown once, in registration order.
    ///
    /// Repeated and reentrant calls are no-ops. Failures from callbacks and
    /// from nested subscriptions are flattened into one error.
    pub fn unsubscribe(&self) -> Result<(), UnsubscriptionError> {
        if self.inner.closed.replace(true) {
            return Ok(());
        }

        let parents = std::mem::take(&mut *self.inner.parents.borrow_mut());
        for parent in parents.iter().filter_map(Weak::upgrade) {
            Self { inner: parent }.detach_child(&self.inner);
        }

        let teardowns = std::mem::take(&mut *self.inner.teardowns.borrow_mut());
        let mut errors = Vec::new();
        for teardown in teardowns {
            match teardown {
                Teardown::Callback(_, run) => {
                    if let Err(err) = run() {
                        errors.push(err);
                    }
                }
                Teardown::Child(child) => {
                    child.detach_parent(&self.inner);
                    if let Err(err) = child.unsubscribe() {
                        errors.extend(err.into_errors());
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(UnsubscriptionError::new(errors))
        }
    }

    /// Wrap this handle in a guard that unsubscribes when dropped.
    #[must_use]
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard {
            subscription: Some(self),
        }
    }

    fn fresh_id(&self) -> TeardownId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        TeardownId(id)
    }

    fn has_parent(&self, parent: &Rc<SubscriptionInner>) -> bool {
        self.inner
            .parents
            .borrow()
            .iter()
            .any(|p| std::ptr::eq(p.as_ptr(), Rc::as_ptr(parent)))
    }

    fn has_ancestor(&self, candidate: &Rc<SubscriptionInner>) -> bool {
        let mut stack: Vec<Rc<SubscriptionInner>> = self
            .inner
            .parents
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        while let Some(node) = stack.pop() {
            if Rc::ptr_eq(&node, candidate) {
                return true;
            }
            stack.extend(node.parents.borrow().iter().filter_map(Weak::upgrade));
        }
        false
    }

    fn detach_child(&self, child: &Rc<SubscriptionInner>) {
        self.inner
            .teardowns
            .borrow_mut()
            .retain(|t| !matches!(t, Teardown::Child(c) if Rc::ptr_eq(&c.inner, child)));
    }

    fn detach_parent(&self, parent: &Rc<SubscriptionInner>) {
        self.inner
            .parents
            .borrow_mut()
            .retain(|p| !std::ptr::eq(p.as_ptr(), Rc::as_ptr(parent)));
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .field("teardowns", &self.teardown_count())
            .finish()
    }
}

/// RAII guard that closes its subscription on drop.
///
/// Teardown failures during drop are logged, since `Drop` cannot return them.
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Option<Subscription>,
}

impl SubscriptionGuard {
    /// Borrow the guarded subscription.
    #[must_use]
    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Give up the guard without closing the subscription.
    #[must_use]
    pub fn disarm(mut self) -> Subscription {
        self.subscription.take().unwrap_or_else(Subscription::closed)
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        if let Err(err) = subscription.unsubscribe() {
            tracing::warn!(error = %err, "teardown failed while dropping subscription guard");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn teardowns_run_in_registration_order() {
        let sub = Subscription::new();
        let seen = log();
        for name in ["A", "B", "C"] {
            let seen = Rc::clone(&seen);
            sub.add_teardown(move || seen.borrow_mut().push(name));
        }
        sub.unsubscribe().unwrap();
        assert_eq!(*seen.borrow(), vec!["A", "B", "C"]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let sub = Subscription::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        sub.add_teardown(move || count_clone.set(count_clone.get() + 1));

        for _ in 0..5 {
            sub.unsubscribe().unwrap();
            assert!(sub.is_closed());
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn reentrant_unsubscribe_runs_nothing_twice() {
        let sub = Subscription::new();
        let seen = log();

        let seen_a = Rc::clone(&seen);
        let handle = sub.clone();
        sub.add_teardown(move || {
            seen_a.borrow_mut().push("A");
            handle.unsubscribe().unwrap();
        });
        let seen_b = Rc::clone(&seen);
        sub.add_teardown(move || seen_b.borrow_mut().push("B"));

        sub.unsubscribe().unwrap();
        assert_eq!(*seen.borrow(), vec!["A", "B"]);
    }

    #[test]
    fn add_after_close_runs_immediately() {
        let sub = Subscription::new();
        sub.unsubscribe().unwrap();

        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);
        sub.add_teardown(move || ran_clone.set(true));
        assert!(ran.get());

        let child = Subscription::new();
        sub.add(&child).unwrap();
        assert!(child.is_closed());
    }

    #[test]
    fn closing_parent_closes_children() {
        let parent = Subscription::new();
        let child = Subscription::new();
        let grandchild = Subscription::new();
        parent.add(&child).unwrap();
        child.add(&grandchild).unwrap();

        parent.unsubscribe().unwrap();
        assert!(child.is_closed());
        assert!(grandchild.is_closed());
    }

    #[test]
    fn child_closing_alone_detaches_from_parent() {
        let parent = Subscription::new();
        let child = Subscription::new();
        parent.add(&child).unwrap();
        assert_eq!(parent.teardown_count(), 1);

        child.unsubscribe().unwrap();
        assert_eq!(parent.teardown_count(), 0);
        assert!(!parent.is_closed());
    }

    #[test]
    fn self_add_is_ignored() {
        let sub = Subscription::new();
        sub.add(&sub).unwrap();
        assert_eq!(sub.teardown_count(), 0);
        sub.unsubscribe().unwrap();
    }

    #[test]
    fn ancestor_add_is_ignored() {
        let root = Subscription::new();
        let mid = Subscription::new();
        let leaf = Subscription::new();
        root.add(&mid).unwrap();
        mid.add(&leaf).unwrap();

        leaf.add(&root).unwrap();
        assert_eq!(leaf.teardown_count(), 0);

        root.unsubscribe().unwrap();
        assert!(leaf.is_closed());
    }

    #[test]
    fn duplicate_child_is_registered_once() {
        let parent = Subscription::new();
        let child = Subscription::new();
        parent.add(&child).unwrap();
        parent.add(&child).unwrap();
        assert_eq!(parent.teardown_count(), 1);
    }

    #[test]
    fn removed_teardowns_do_not_run() {
        let sub = Subscription::new();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);
        let id = sub.add_teardown(move || ran_clone.set(true));
        let child = Subscription::new();
        sub.add(&child).unwrap();

        sub.remove_teardown(id);
        sub.remove(&child);
        sub.unsubscribe().unwrap();

        assert!(!ran.get());
        assert!(!child.is_closed());
    }

    #[test]
    fn remove_of_unknown_is_noop() {
        let sub = Subscription::new();
        let other = Subscription::new();
        sub.remove(&other);
        sub.remove_teardown(TeardownId(99));
        assert_eq!(sub.teardown_count(), 0);
    }

    #[test]
    fn failures_are_aggregated_after_full_chain() {
        let parent = Subscription::new();
        let seen = log();

        parent
            .add_fallible(|| Err(RxError::msg("first")))
            .unwrap();
        let seen_mid = Rc::clone(&seen);
        parent.add_teardown(move || seen_mid.borrow_mut().push("ran"));
        let child = Subscription::new();
        child
            .add_fallible(|| Err(RxError::msg("nested")))
            .unwrap();
        parent.add(&child).unwrap();

        let err = parent.unsubscribe().unwrap_err();
        assert_eq!(
            err.errors(),
            &[RxError::msg("first"), RxError::msg("nested")]
        );
        assert_eq!(*seen.borrow(), vec!["ran"]);
    }

    #[test]
    fn fallible_add_on_closed_reports_failure() {
        let sub = Subscription::closed();
        let err = sub.add_fallible(|| Err(RxError::msg("late"))).unwrap_err();
        assert_eq!(err.errors().len(), 1);
    }

    #[test]
    fn guard_unsubscribes_on_drop() {
        let sub = Subscription::new();
        {
            let _guard = sub.clone().into_guard();
        }
        assert!(sub.is_closed());

        let other = Subscription::new();
        let kept = other.clone().into_guard().disarm();
        assert!(!kept.is_closed());
    }

    #[test]
    fn debug_format() {
        let sub = Subscription::new();
        sub.add_teardown(|| {});
        let dbg = format!("{sub:?}");
        assert!(dbg.contains("closed: false"));
        assert!(dbg.contains("teardowns: 1"));
    }
}
