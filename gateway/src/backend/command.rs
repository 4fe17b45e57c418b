//! Resolved backend command and the outcome of running it

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GatewayError;

/// Text returned on success when the backend printed nothing.
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "(No response text returned by backend command.)";

/// Message used when a failing backend wrote nothing to stderr.
pub const UNKNOWN_BACKEND_ERROR: &str = "Unknown backend error";

/// A fully resolved invocation of the external backend.
///
/// Built by [`CommandResolver`](super::CommandResolver) and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommand {
    program: String,
    args: Vec<String>,
    stdin: String,
    working_dir: Option<PathBuf>,
    raw_args: bool,
}

impl BackendCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I, stdin: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: stdin.into(),
            working_dir: None,
            raw_args: false,
        }
    }

    /// Mark the arguments as already escaped for the target's own parser.
    ///
    /// Windows only: they are appended to the command line verbatim instead
    /// of being quoted by the standard library.
    pub fn with_raw_args(mut self) -> Self {
        self.raw_args = true;
        self
    }

    /// Run the command from `dir` instead of the gateway's own cwd.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Program followed by its arguments, in order.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    pub fn raw_args(&self) -> bool {
        self.raw_args
    }

    pub fn stdin(&self) -> &str {
        &self.stdin
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

/// Captured outcome of one child process run to completion.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    /// None when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn the raw outcome into the text handed to callers.
    ///
    /// Non-zero exits become [`GatewayError::BackendFailure`]; a successful
    /// run never yields an empty string.
    pub fn into_response(self) -> Result<String, GatewayError> {
        if !self.success() {
            let stderr = self.stderr.trim();
            let message = if stderr.is_empty() {
                UNKNOWN_BACKEND_ERROR.to_string()
            } else {
                stderr.to_string()
            };
            return Err(GatewayError::BackendFailure {
                exit_code: self.exit_code,
                message,
            });
        }

        let stdout = self.stdout.trim();
        if stdout.is_empty() {
            Ok(EMPTY_RESPONSE_PLACEHOLDER.to_string())
        } else {
            Ok(stdout.to_string())
        }
    }
}
