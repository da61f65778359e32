//! Consumer policies: how a slow handler copes with a fast producer.
//!
//! - [`ConsumerPolicy::BufferAll`]: every value is queued and handled in
//!   order. The handler may lag the producer arbitrarily.
//! - [`ConsumerPolicy::ConflateLatest`]: values that arrive while the handler
//!   is busy collapse into the most recent one (latest wins), which is
//!   delivered once the handler is free.
//! - [`ConsumerPolicy::CollectLatest`]: a new value cancels the in-flight
//!   handler invocation and restarts the handler with the new value.
//!
//! # Execution model
//!
//! Producer and consumer are two futures joined inside the caller's task;
//! nothing is spawned and no `Send` bound is required. Values reach the
//! handler in source order. Policies may drop values, never reorder them.
//!
//! # Cancellation
//!
//! Every handler invocation receives its own child [`Cx`]. Under
//! `CollectLatest` a superseded invocation first has its `Cx` cancelled and
//! is then dropped, so it stops at its current suspension point and performs
//! nothing further. Cancellation is an expected transition and is reported in
//! [`ConsumeReport::cancelled`], never as an error.

use std::fmt;
use std::future::Future;
use std::pin::{Pin, pin};
use std::str::FromStr;

use flowlab_core::cx::{Cx, CxController};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

/// Backpressure strategy for [`consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConsumerPolicy {
    #[default]
    BufferAll,
    ConflateLatest,
    CollectLatest,
}

impl ConsumerPolicy {
    pub const ALL: [ConsumerPolicy; 3] = [
        ConsumerPolicy::BufferAll,
        ConsumerPolicy::ConflateLatest,
        ConsumerPolicy::CollectLatest,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BufferAll => "buffer",
            Self::ConflateLatest => "conflate",
            Self::CollectLatest => "collect-latest",
        }
    }
}

impl fmt::Display for ConsumerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConsumerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|policy| policy.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown consumer policy: {s}"))
    }
}

/// Handler lifecycle as seen by the consumer.
///
/// `Idle → Handling(v)` on a new value, `Handling → Cancelling` when a newer
/// value supersedes it (collect-latest only), `Cancelling → Handling(new)`
/// once the stale invocation is torn down, `Handling → Idle` on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerState<T> {
    Idle,
    Handling(T),
    Cancelling,
}

/// What happened to each value during one [`consume`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeReport<T> {
    /// Values handed to the handler, in order.
    pub started: Vec<T>,
    /// Values whose handler invocation ran to completion.
    pub completed: Vec<T>,
    /// Values whose handler invocation was cancelled mid-flight.
    pub cancelled: Vec<T>,
    /// Values discarded by conflation without ever reaching the handler.
    pub dropped: Vec<T>,
    /// Every state entered after the initial `Idle`.
    pub transitions: Vec<HandlerState<T>>,
}

impl<T> Default for ConsumeReport<T> {
    fn default() -> Self {
        Self {
            started: Vec::new(),
            completed: Vec::new(),
            cancelled: Vec::new(),
            dropped: Vec::new(),
            transitions: Vec::new(),
        }
    }
}

impl<T> ConsumeReport<T> {
    /// The state the consumer ended in.
    #[must_use]
    pub fn final_state(&self) -> Option<&HandlerState<T>> {
        self.transitions.last()
    }
}

impl<T: Clone + fmt::Debug> ConsumeReport<T> {
    fn start(&mut self, value: &T) {
        tracing::trace!(value = ?value, "policy.handling");
        self.started.push(value.clone());
        self.transitions.push(HandlerState::Handling(value.clone()));
    }

    fn complete(&mut self, value: T) {
        tracing::trace!(value = ?value, "policy.completed");
        self.completed.push(value);
        self.transitions.push(HandlerState::Idle);
    }

    fn cancel(&mut self, value: T) {
        tracing::debug!(value = ?value, "policy.cancelled");
        self.cancelled.push(value);
        self.transitions.push(HandlerState::Cancelling);
    }

    fn drop_value(&mut self, value: T) {
        tracing::trace!(value = ?value, "policy.conflated");
        self.dropped.push(value);
    }
}

/// Deliver every value of `source` to `handler` under `policy`.
///
/// The handler receives the value and a [`Cx`] scoped to that invocation.
/// Returns once the source is exhausted and the last handler invocation has
/// finished.
pub async fn consume<S, T, F, Fut>(
    source: S,
    policy: ConsumerPolicy,
    handler: F,
) -> ConsumeReport<T>
where
    S: Stream<Item = T>,
    T: Clone + fmt::Debug,
    F: FnMut(T, Cx) -> Fut,
    Fut: Future<Output = ()>,
{
    let (root, _root_ctrl) = Cx::background();
    tracing::debug!(policy = policy.name(), cx_id = root.id(), "policy.consume");
    match policy {
        ConsumerPolicy::BufferAll => queued(source, &root, handler, false).await,
        ConsumerPolicy::ConflateLatest => queued(source, &root, handler, true).await,
        ConsumerPolicy::CollectLatest => collect_latest(source, &root, handler).await,
    }
}

/// Buffer-all and conflate-latest: a producer future feeds an unbounded
/// queue; the consumer drains it, optionally skipping to the newest entry.
async fn queued<S, T, F, Fut>(
    source: S,
    root: &Cx,
    mut handler: F,
    conflate: bool,
) -> ConsumeReport<T>
where
    S: Stream<Item = T>,
    T: Clone + fmt::Debug,
    F: FnMut(T, Cx) -> Fut,
    Fut: Future<Output = ()>,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut report = ConsumeReport::default();

    let producer = async move {
        let mut source = pin!(source);
        while let Some(value) = source.next().await {
            if tx.send(value).is_err() {
                break;
            }
        }
        // Dropping `tx` closes the queue once it drains.
    };

    let consumer = async {
        while let Some(mut value) = rx.recv().await {
            if conflate {
                // Latest wins: anything queued behind `value` supersedes it.
                while let Ok(newer) = rx.try_recv() {
                    report.drop_value(value);
                    value = newer;
                }
            }
            report.start(&value);
            let (cx, _ctrl) = root.child();
            handler(value.clone(), cx).await;
            report.complete(value);
        }
    };

    futures::join!(producer, consumer);
    report
}

struct InFlight<T, Fut> {
    value: T,
    ctrl: CxController,
    future: Pin<Box<Fut>>,
}

enum Step<T> {
    Finished,
    Next(Option<T>),
}

/// Collect-latest: race the in-flight handler against the next emission.
async fn collect_latest<S, T, F, Fut>(source: S, root: &Cx, mut handler: F) -> ConsumeReport<T>
where
    S: Stream<Item = T>,
    T: Clone + fmt::Debug,
    F: FnMut(T, Cx) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut source = pin!(source);
    let mut report = ConsumeReport::default();
    let mut in_flight: Option<InFlight<T, Fut>> = None;

    let mut launch = |value: T, report: &mut ConsumeReport<T>| {
        report.start(&value);
        let (cx, ctrl) = root.child();
        InFlight {
            future: Box::pin(handler(value.clone(), cx)),
            value,
            ctrl,
        }
    };

    loop {
        let step = match in_flight.as_mut() {
            None => Step::Next(source.next().await),
            Some(current) => {
                // Completion wins a tie with a simultaneous emission.
                tokio::select! {
                    biased;
                    () = current.future.as_mut() => Step::Finished,
                    next = source.next() => Step::Next(next),
                }
            }
        };

        match step {
            Step::Finished => {
                if let Some(done) = in_flight.take() {
                    report.complete(done.value);
                }
            }
            Step::Next(Some(value)) => {
                if let Some(stale) = in_flight.take() {
                    stale.ctrl.cancel();
                    let InFlight { value: stale_value, future, .. } = stale;
                    drop(future);
                    report.cancel(stale_value);
                }
                in_flight = Some(launch(value, &mut report));
            }
            Step::Next(None) => {
                // Source exhausted: the last invocation runs to completion.
                if let Some(last) = in_flight.take() {
                    last.future.await;
                    report.complete(last.value);
                }
                break;
            }
        }
    }

    report
}
