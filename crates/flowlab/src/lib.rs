#![forbid(unsafe_code)]

//! flowlab public facade crate.
//!
//! Re-exports the cancellation context and the emission pipeline under one
//! roof.
//!
//! ```
//! use flowlab::prelude::*;
//!
//! let counter = Counter::new();
//! counter.increment();
//! assert_eq!(counter.current_value(), 1);
//!
//! let log = BroadcastLog::new(5);
//! for value in 0..=10u32 {
//!     log.emit(value);
//! }
//! assert_eq!(log.replay(), vec![6, 7, 8, 9, 10]);
//!
//! let mut stages = Stages::even_doubled_logged();
//! assert_eq!(stages.step(4), Some(8));
//! assert_eq!(stages.step(3), None);
//!
//! let (root, ctrl) = Cx::background();
//! ctrl.cancel();
//! assert_eq!(root.check(), Err(CxError::Cancelled));
//! assert_eq!(ConsumerPolicy::ALL.len(), 3);
//! ```

pub use flowlab_core as core;
pub use flowlab_runtime as runtime;

pub mod prelude {
    pub use flowlab_core::cx::{Cx, CxController, CxError};
    pub use flowlab_runtime::policy::{ConsumeReport, ConsumerPolicy, HandlerState, consume};
    pub use flowlab_runtime::reactive::{BroadcastLog, Counter, StateCell, Subscription};
    pub use flowlab_runtime::source::{ColdSource, CountdownSource, Course, TimedCourse, countdown};
    pub use flowlab_runtime::stages::Stages;
    pub use flowlab_runtime::terminal::{count, fold, reduce};
    pub use flowlab_runtime::PipelineError;
}
