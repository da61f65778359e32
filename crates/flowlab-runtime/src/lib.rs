#![forbid(unsafe_code)]

//! Emission pipeline: cold sources, transformation stages, terminal folds,
//! consumer policies, and the reactive holders the display layer reads.
//!
//! A pipeline composes as
//! `source → stages (filter → map → observe) → consumer policy → holder`.
//! Everything runs cooperatively inside one task: producers and consumers are
//! futures joined together, and the only suspension points are timed waits
//! and handler boundaries.

pub mod error;
pub mod policy;
pub mod reactive;
pub mod source;
pub mod stages;
pub mod terminal;

pub use error::PipelineError;
