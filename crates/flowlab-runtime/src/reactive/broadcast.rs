#![forbid(unsafe_code)]

//! Hot broadcast channel with a bounded replay buffer.
//!
//! [`BroadcastLog<T>`] remembers the last `capacity` emitted items. A new
//! subscriber first receives that replay window (oldest first) and then
//! every later emission. Emission is independent of subscribers: items are
//! recorded even when nobody listens.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use futures::Stream;

use super::state::{Callback, Subscription, live_callbacks, register_waker};

/// Replay window used by [`BroadcastLog::default`].
pub const DEFAULT_REPLAY: usize = 5;

struct LogInner<T> {
    capacity: usize,
    buffer: VecDeque<(u64, T)>,
    next_seq: u64,
    subscribers: Vec<Weak<Callback<T>>>,
    wakers: Vec<Waker>,
}

impl<T> LogInner<T> {
    fn oldest_seq(&self) -> u64 {
        self.buffer.front().map_or(self.next_seq, |(seq, _)| *seq)
    }
}

/// A hot, replaying broadcast log.
///
/// Cloning creates another handle to the same log.
pub struct BroadcastLog<T> {
    inner: Rc<RefCell<LogInner<T>>>,
}

impl<T> Clone for BroadcastLog<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for BroadcastLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("BroadcastLog")
            .field("capacity", &inner.capacity)
            .field("buffered", &inner.buffer.len())
            .field("emitted", &inner.next_seq)
            .finish()
    }
}

impl<T: Clone + 'static> Default for BroadcastLog<T> {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY)
    }
}

impl<T: Clone + 'static> BroadcastLog<T> {
    /// Create a log that replays the last `capacity` items.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Rc::new(RefCell::new(LogInner {
                capacity,
                buffer: VecDeque::with_capacity(capacity),
                next_seq: 0,
                subscribers: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity
    }

    /// Total number of items ever emitted.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.inner.borrow().next_seq
    }

    /// Publish one item: record it, evict past capacity, notify subscribers.
    pub fn emit(&self, value: T) {
        let (callbacks, wakers) = {
            let mut inner = self.inner.borrow_mut();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.buffer.push_back((seq, value.clone()));
            while inner.buffer.len() > inner.capacity {
                inner.buffer.pop_front();
            }
            tracing::trace!(seq, buffered = inner.buffer.len(), "broadcast.emit");
            let callbacks = live_callbacks(&mut inner.subscribers);
            (callbacks, std::mem::take(&mut inner.wakers))
        };
        for callback in callbacks {
            callback(&value);
        }
        for waker in wakers {
            waker.wake();
        }
    }

    /// Snapshot of the replay window, oldest first.
    #[must_use]
    pub fn replay(&self) -> Vec<T> {
        self.inner
            .borrow()
            .buffer
            .iter()
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Subscribe a callback. The replay window is delivered synchronously
    /// before this returns; live items follow in registration order.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        for value in self.replay() {
            callback(&value);
        }
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

    /// Async subscriber: yields the replay window, then live items.
    ///
    /// A stream that falls more than `capacity` items behind skips ahead to
    /// the oldest retained item. It ends once every log handle is dropped.
    #[must_use]
    pub fn stream(&self) -> BroadcastStream<T> {
        let cursor = self.inner.borrow().oldest_seq();
        BroadcastStream {
            inner: Rc::downgrade(&self.inner),
            cursor,
            skipped: 0,
        }
    }
}

/// Async view of a [`BroadcastLog`].
pub struct BroadcastStream<T> {
    inner: Weak<RefCell<LogInner<T>>>,
    cursor: u64,
    skipped: u64,
}

impl<T> BroadcastStream<T> {
    /// Items this stream missed because it lagged past the replay window.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<T> fmt::Debug for BroadcastStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastStream")
            .field("cursor", &self.cursor)
            .field("skipped", &self.skipped)
            .finish()
    }
}

impl<T: Clone> Stream for BroadcastStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.upgrade() else {
            return Poll::Ready(None);
        };
        let mut inner = inner.borrow_mut();
        let oldest = inner.oldest_seq();
        if this.cursor < oldest {
            this.skipped += oldest - this.cursor;
            tracing::debug!(skipped = oldest - this.cursor, "broadcast.lagged");
            this.cursor = oldest;
        }
        let offset = usize::try_from(this.cursor - oldest).unwrap_or(usize::MAX);
        if let Some((seq, value)) = inner.buffer.get(offset) {
            this.cursor = seq + 1;
            return Poll::Ready(Some(value.clone()));
        }
        register_waker(&mut inner.wakers, cx.waker());
        Poll::Pending
    }
}
