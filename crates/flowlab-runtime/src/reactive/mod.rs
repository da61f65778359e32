#![forbid(unsafe_code)]

//! Hot holders the display layer reads from.
//!
//! [`StateCell`] keeps exactly one value and tells observers when it changes;
//! [`Counter`] is the increment-only specialisation the screen uses.
//! [`BroadcastLog`] is the opposite shape: it keeps a short tail of emitted
//! items and replays it to whoever subscribes late.
//!
//! Both are single-threaded (`Rc<RefCell<..>>`) and support two kinds of
//! observer: synchronous callbacks guarded by a [`Subscription`], and async
//! streams that hold only a weak reference and finish when the holder goes
//! away.
//!
//! Guarantees:
//!
//! - callbacks run in the order they were registered;
//! - a `StateCell` version moves only when the stored value actually changes;
//! - a dropped `Subscription` never fires again;
//! - a `BroadcastLog` holds at most `capacity` items, evicting oldest first.

pub mod broadcast;
pub mod state;

pub use broadcast::{BroadcastLog, BroadcastStream};
pub use state::{Counter, StateCell, StateStream, Subscription};
