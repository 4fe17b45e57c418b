//! Readiness-aware gateway for a slow-starting command-line backend
//!
//! - [`backend`]: resolve and run the external backend command
//! - [`warmup`]: background warm-up probe and readiness reporting
//! - [`web`]: HTTP surface (`/status`, `/send`)

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod warmup;
pub mod web;

pub use error::{GatewayError, Result};
