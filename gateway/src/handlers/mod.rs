//! Command handlers module
//!
//! Handler functions for CLI commands. [`CommandContext`] carries the
//! resolved settings shared across handlers.

pub mod send;
pub mod serve;

pub use send::{run_resolve, run_send};
pub use serve::run_serve;

use anyhow::Result;

use crate::cli::Cli;
use crate::config::{GatewayFileConfig, Settings};

/// Shared context for command handlers
pub struct CommandContext {
    pub settings: Settings,
    pub verbose: u8,
}

impl CommandContext {
    /// Resolve settings with priority: CLI/env > config file > defaults
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file_config = GatewayFileConfig::load()?;
        Ok(Self {
            settings: Settings::resolve(cli.overrides(), file_config),
            verbose: cli.verbose,
        })
    }
}
