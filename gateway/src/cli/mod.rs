//! CLI module
//!
//! Argument definitions and logging setup for the `gateway` binary.

pub mod args;
pub mod logging;

pub use args::{Cli, Commands};
pub use logging::init_tracing;
