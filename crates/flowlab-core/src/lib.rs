#![forbid(unsafe_code)]

//! Core: cooperative cancellation context and logging setup.

pub mod cx;
pub mod logging;
