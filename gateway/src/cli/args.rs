//! CLI argument definitions
//!
//! Contains the main CLI struct and Commands enum for clap parsing.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::SettingsOverrides;

#[derive(Parser, Debug)]
#[command(name = "gateway")]
#[command(about = "Readiness-aware HTTP gateway for a command-line conversational backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the backend launcher/script (also the backend's cwd)
    #[arg(long, env = "BACKEND_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Full backend launch command; the prompt is appended as the last argument
    #[arg(long, env = "OVERRIDE_BACKEND_CMD", global = true)]
    pub override_cmd: Option<String>,

    /// Prompt used for the warm-up probe
    #[arg(long, env = "BOOTSTRAP_PROMPT", global = true)]
    pub bootstrap_prompt: Option<String>,

    /// Seconds before warm-up degrades to allowing requests
    #[arg(long, env = "WARMUP_TIMEOUT_SECONDS", global = true)]
    pub warmup_timeout: Option<u64>,

    /// Per-request backend deadline in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", global = true)]
    pub request_timeout: Option<u64>,

    /// Maximum concurrently running backend processes (0 = unlimited)
    #[arg(long, env = "MAX_CONCURRENT_INVOCATIONS", global = true)]
    pub max_concurrent: Option<usize>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the warm-up probe and serve the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "GATEWAY_PORT")]
        port: Option<u16>,
        /// Address to bind
        #[arg(short, long, env = "GATEWAY_BIND")]
        bind: Option<IpAddr>,
        /// Open the chat page in a browser once the server is up
        #[arg(long)]
        open: bool,
    },
    /// Send one prompt to the backend and print the response
    Send {
        /// Prompt text
        prompt: String,
    },
    /// Show the command that would run for a prompt, without running it
    Resolve {
        /// Prompt text
        prompt: String,
    },
}

impl Cli {
    /// Settings given on the command line or through the environment
    pub fn overrides(&self) -> SettingsOverrides {
        let (port, bind) = match &self.command {
            Commands::Serve { port, bind, .. } => (*port, *bind),
            _ => (None, None),
        };

        SettingsOverrides {
            root: self.root.clone(),
            override_cmd: self.override_cmd.clone(),
            bootstrap_prompt: self.bootstrap_prompt.clone(),
            warmup_timeout_secs: self.warmup_timeout,
            request_timeout_secs: self.request_timeout,
            max_concurrent: self.max_concurrent,
            port,
            bind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "gateway",
            "--override-cmd",
            "echo",
            "--request-timeout",
            "1",
            "serve",
            "--port",
            "8080",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.override_cmd.as_deref(), Some("echo"));
        assert_eq!(overrides.request_timeout_secs, Some(1));
        assert_eq!(overrides.port, Some(8080));
    }

    #[test]
    fn test_send_takes_prompt() {
        let cli = Cli::try_parse_from(["gateway", "send", "hello there"]).unwrap();
        match cli.command {
            Commands::Send { prompt } => assert_eq!(prompt, "hello there"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
