//! Cancellation context for handler invocations.
//!
//! Every handler call made by a consumer policy receives its own [`Cx`],
//! derived from the consumer's root context. The consumer keeps the matching
//! [`CxController`]; when a newer value supersedes the one being handled, the
//! controller is cancelled and the handler notices at its next suspension
//! point, either by polling [`Cx::is_cancelled`] or because a [`Cx::sleep`]
//! or [`Cx::cancelled`] wait resolves early.
//!
//! Cancelling a context also cancels everything derived from it. Dropping a
//! controller does nothing: cancellation is always an explicit call.
//!
//! ```
//! use flowlab_core::cx::Cx;
//!
//! let (root, root_ctrl) = Cx::background();
//! let (call, _call_ctrl) = root.child();
//! root_ctrl.cancel();
//! assert!(call.is_cancelled());
//! ```

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;

static IDS: AtomicU64 = AtomicU64::new(1);

/// Process-wide number of contexts that have been cancelled.
static CANCELLED: AtomicU64 = AtomicU64::new(0);

/// How many contexts have been cancelled since start-up.
#[must_use]
pub fn cx_cancellations_total() -> u64 {
    CANCELLED.load(Ordering::Relaxed)
}

#[derive(Debug)]
struct Node {
    id: u64,
    flag: AtomicBool,
    wake: Notify,
    parent: Option<Arc<Node>>,
}

impl Node {
    fn spawn(parent: Option<Arc<Node>>) -> Arc<Self> {
        Arc::new(Self {
            id: IDS.fetch_add(1, Ordering::Relaxed),
            flag: AtomicBool::new(false),
            wake: Notify::new(),
            parent,
        })
    }

    /// This node followed by each of its ancestors.
    fn lineage(self: &Arc<Self>) -> impl Iterator<Item = &Arc<Node>> {
        std::iter::successors(Some(self), |node| node.parent.as_ref())
    }
}

/// Read side of a cancellation scope. Clones share the same scope.
#[derive(Clone, Debug)]
pub struct Cx {
    node: Arc<Node>,
}

impl Cx {
    /// A fresh root scope with no parent.
    #[must_use]
    pub fn background() -> (Self, CxController) {
        Self::pair(Node::spawn(None))
    }

    /// A nested scope that is also cancelled when `self` is.
    #[must_use]
    pub fn child(&self) -> (Self, CxController) {
        Self::pair(Node::spawn(Some(Arc::clone(&self.node))))
    }

    fn pair(node: Arc<Node>) -> (Self, CxController) {
        (
            Self {
                node: Arc::clone(&node),
            },
            CxController { node },
        )
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.node.id
    }

    /// True once this scope or any enclosing one has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.node
            .lineage()
            .any(|node| node.flag.load(Ordering::Acquire))
    }

    /// `Err(CxError::Cancelled)` once cancelled, for use with `?`.
    pub fn check(&self) -> Result<(), CxError> {
        if self.is_cancelled() {
            Err(CxError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Completes when this scope or an enclosing one is cancelled.
    pub async fn cancelled(&self) {
        loop {
            // Arm every waiter before reading the flags so a cancel landing
            // in between still wakes us.
            let mut waiters: Vec<Pin<Box<Notified<'_>>>> = self
                .node
                .lineage()
                .map(|node| Box::pin(node.wake.notified()))
                .collect();
            for waiter in &mut waiters {
                waiter.as_mut().enable();
            }
            if self.is_cancelled() {
                return;
            }
            futures::future::select_all(waiters).await;
        }
    }

    /// Wait `duration`. Returns `false` if the scope was cancelled first.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            () = self.cancelled() => false,
            () = tokio::time::sleep(duration) => !self.is_cancelled(),
        }
    }
}

/// Write side of a cancellation scope.
#[derive(Debug)]
pub struct CxController {
    node: Arc<Node>,
}

impl CxController {
    /// Cancel the scope and wake anything waiting on it. Idempotent.
    pub fn cancel(&self) {
        if self.node.flag.swap(true, Ordering::Release) {
            return;
        }
        CANCELLED.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cx_id = self.node.id, "cx cancelled");
        self.node.wake.notify_waiters();
    }

    /// Whether `cancel` has been called on this scope itself.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.node.flag.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.node.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CxError {
    #[error("context cancelled")]
    Cancelled,
}
