#![forbid(unsafe_code)]

//! Counter and countdown demo built on the flowlab pipeline.
//!
//! `screen` renders the latest countdown value next to a counter button;
//! the other subcommands run one collection strategy each and print a
//! transcript of what happened, with elapsed milliseconds.

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod session;
pub mod strategies;
pub mod transcript;

pub use cli::{Cli, Command, execute, run, run_from_env};
pub use config::DemoConfig;
pub use error::{DemoError, Result};
