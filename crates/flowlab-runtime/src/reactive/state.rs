#![forbid(unsafe_code)]

//! Observable state cell.
//!
//! [`StateCell<T>`] always holds a value. Readers get it synchronously with
//! [`get`](StateCell::get); observers receive the current value and every
//! later change. Slow async observers are conflated: a [`StateStream`] that
//! falls behind skips straight to the newest value.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use futures::Stream;

pub(crate) type Callback<T> = dyn Fn(&T);

// ─── Subscription ────────────────────────────────────────────────────────────

/// Keeps a registered callback alive. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl Subscription {
    pub(crate) fn hold<T: 'static>(callback: Rc<Callback<T>>) -> Self {
        Self {
            _guard: Box::new(callback),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Upgrade live callbacks, dropping dead ones, preserving registration order.
pub(crate) fn live_callbacks<T>(
    subscribers: &mut Vec<Weak<Callback<T>>>,
) -> Vec<Rc<Callback<T>>> {
    let mut live = Vec::with_capacity(subscribers.len());
    subscribers.retain(|weak| match weak.upgrade() {
        Some(callback) => {
            live.push(callback);
            true
        }
        None => false,
    });
    live
}

pub(crate) fn register_waker(wakers: &mut Vec<Waker>, waker: &Waker) {
    if !wakers.iter().any(|w| w.will_wake(waker)) {
        wakers.push(waker.clone());
    }
}

// ─── StateCell ───────────────────────────────────────────────────────────────

struct StateInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
    wakers: Vec<Waker>,
}

/// A single-writer observable value.
///
/// Cloning a `StateCell` creates a new handle to the **same** value.
pub struct StateCell<T> {
    inner: Rc<RefCell<StateInner<T>>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("StateCell")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> StateCell<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StateInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls `set`/`update` on the same cell (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of changes applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value. Equal values are ignored.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Mutate the value in place; notifies only if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Register a change callback. It fires on every later change, in
    /// registration order, until the returned guard is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription::hold(callback)
    }

    /// Number of live callback subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Observe as an async stream: the current value first, then changes.
    ///
    /// The stream ends when every `StateCell` handle has been dropped.
    #[must_use]
    pub fn observe(&self) -> StateStream<T> {
        StateStream {
            inner: Rc::downgrade(&self.inner),
            seen: None,
        }
    }

    fn notify(&self) {
        // Release the borrow before running callbacks so they may read the cell.
        let (value, callbacks, wakers) = {
            let mut inner = self.inner.borrow_mut();
            let callbacks = live_callbacks(&mut inner.subscribers);
            let wakers = std::mem::take(&mut inner.wakers);
            (inner.value.clone(), callbacks, wakers)
        };
        for callback in callbacks {
            callback(&value);
        }
        for waker in wakers {
            waker.wake();
        }
    }
}

// ─── StateStream ─────────────────────────────────────────────────────────────

/// Async view of a [`StateCell`]; yields the latest value per change.
pub struct StateStream<T> {
    inner: Weak<RefCell<StateInner<T>>>,
    seen: Option<u64>,
}

impl<T> fmt::Debug for StateStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStream")
            .field("seen", &self.seen)
            .field("live", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T: Clone> Stream for StateStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.upgrade() else {
            return Poll::Ready(None);
        };
        let mut inner = inner.borrow_mut();
        if this.seen != Some(inner.version) {
            this.seen = Some(inner.version);
            return Poll::Ready(Some(inner.value.clone()));
        }
        register_waker(&mut inner.wakers, cx.waker());
        Poll::Pending
    }
}

// ─── Counter ─────────────────────────────────────────────────────────────────

/// Monotonic counter built on [`StateCell`].
#[derive(Clone, Debug)]
pub struct Counter {
    cell: StateCell<u64>,
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl Counter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: StateCell::new(0),
        }
    }

    /// Add one. Always succeeds; saturates at `u64::MAX`.
    pub fn increment(&self) {
        self.cell.update(|n| *n = n.saturating_add(1));
    }

    #[must_use]
    pub fn current_value(&self) -> u64 {
        self.cell.get()
    }

    #[must_use]
    pub fn observe(&self) -> StateStream<u64> {
        self.cell.observe()
    }

    /// The underlying cell, for callback subscriptions.
    #[must_use]
    pub fn cell(&self) -> &StateCell<u64> {
        &self.cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::cell::Cell;

    #[test]
    fn get_set_and_version() {
        let cell = StateCell::new(1);
        assert_eq!(cell.get(), 1);
        assert_eq!(cell.version(), 0);
        cell.set(2);
        assert_eq!(cell.get(), 2);
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn setting_equal_value_is_noop() {
        let cell = StateCell::new(5);
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let _sub = cell.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));
        cell.set(5);
        assert_eq!(cell.version(), 0);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn subscribers_notified_in_registration_order() {
        let cell = StateCell::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        let _a = cell.subscribe(move |v| first.borrow_mut().push(("a", *v)));
        let _b = cell.subscribe(move |v| second.borrow_mut().push(("b", *v)));
        cell.set(7);
        assert_eq!(*order.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let cell = StateCell::new(0);
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let sub = cell.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));
        cell.set(1);
        assert_eq!(cell.subscriber_count(), 1);
        drop(sub);
        cell.set(2);
        assert_eq!(calls.get(), 1);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn callbacks_may_read_the_cell() {
        let cell = StateCell::new(0);
        let reader = cell.clone();
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        let _sub = cell.subscribe(move |_| seen_clone.set(reader.get()));
        cell.set(3);
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn clone_shares_state() {
        let a = StateCell::new(String::from("x"));
        let b = a.clone();
        b.set(String::from("y"));
        assert_eq!(a.get(), "y");
        assert_eq!(a.with(String::len), 1);
    }

    #[tokio::test]
    async fn observe_yields_current_value_first() {
        let cell = StateCell::new(10);
        let mut stream = cell.observe();
        assert_eq!(stream.next().await, Some(10));
        cell.set(11);
        assert_eq!(stream.next().await, Some(11));
    }

    #[tokio::test]
    async fn observe_conflates_when_lagging() {
        let cell = StateCell::new(0);
        let mut stream = cell.observe();
        assert_eq!(stream.next().await, Some(0));
        cell.set(1);
        cell.set(2);
        cell.set(3);
        assert_eq!(stream.next().await, Some(3));
    }

    #[tokio::test]
    async fn observe_ends_when_cell_dropped() {
        let cell = StateCell::new(0);
        let mut stream = cell.observe();
        assert_eq!(stream.next().await, Some(0));
        drop(cell);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn pending_observer_is_woken_by_set() {
        let cell = StateCell::new(0);
        let mut stream = cell.observe();
        assert_eq!(stream.next().await, Some(0));
        let writer = async {
            tokio::task::yield_now().await;
            cell.set(42);
        };
        let (next, ()) = tokio::join!(stream.next(), writer);
        assert_eq!(next, Some(42));
    }

    #[test]
    fn counter_increments_by_one() {
        let counter = Counter::new();
        assert_eq!(counter.current_value(), 0);
        for expected in 1..=5 {
            counter.increment();
            assert_eq!(counter.current_value(), expected);
        }
        assert_eq!(counter.cell().version(), 5);
    }
}
