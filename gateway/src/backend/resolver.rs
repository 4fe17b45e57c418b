//! Command resolution
//!
//! Decides which external command runs a prompt. Search order:
//! 1. `OVERRIDE_BACKEND_CMD` (shell-split, prompt appended)
//! 2. Batch launcher in the backend root (Windows only, else script fallback)
//! 3. Script entry point in the backend root
//!
//! Platform and filesystem checks go through [`HostProbe`] so each branch can
//! be exercised without the real host.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::command::BackendCommand;
use crate::error::{GatewayError, Result};

/// What the resolver needs to know about the host.
pub trait HostProbe: Send + Sync {
    /// Whether the host can run batch launchers through its command interpreter
    fn supports_batch(&self) -> bool;

    fn file_exists(&self, path: &Path) -> bool;
}

/// The machine the gateway is running on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn supports_batch(&self) -> bool {
        cfg!(windows)
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Inputs for command resolution
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Directory holding the launcher and script; also the child's cwd
    pub root: PathBuf,
    /// Batch launcher file name (relative to `root`)
    pub launcher: String,
    /// Script entry point file name (relative to `root`)
    pub script: String,
    /// Interpreter used to run the script entry point
    pub interpreter: String,
    /// Full launch template; the prompt is appended as the last argument
    pub override_cmd: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            launcher: default_launcher(),
            script: default_script(),
            interpreter: default_interpreter(),
            override_cmd: None,
        }
    }
}

pub fn default_launcher() -> String {
    "RunBackend.bat".to_string()
}

pub fn default_script() -> String {
    "app.py".to_string()
}

pub fn default_interpreter() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}

/// Builds a [`BackendCommand`] for a prompt.
#[derive(Clone)]
pub struct CommandResolver {
    config: ResolverConfig,
    probe: Arc<dyn HostProbe>,
}

impl CommandResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_probe(config, Arc::new(SystemProbe))
    }

    pub fn with_probe(config: ResolverConfig, probe: Arc<dyn HostProbe>) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolve(&self, prompt: &str) -> Result<BackendCommand> {
        if let Some(template) = self
            .config
            .override_cmd
            .as_deref()
            .filter(|t| !t.trim().is_empty())
        {
            return override_command(template, prompt, &self.config.root);
        }

        let launcher = self.config.root.join(&self.config.launcher);
        let script = self.config.root.join(&self.config.script);

        if self.probe.file_exists(&launcher) {
            if self.probe.supports_batch() {
                tracing::debug!(launcher = %launcher.display(), "Resolved batch launcher");
                return Ok(self.batch_command(prompt));
            }
            if self.probe.file_exists(&script) {
                tracing::debug!(
                    launcher = %launcher.display(),
                    script = %script.display(),
                    "Host cannot run batch launchers, using script entry point"
                );
                return Ok(self.script_command(prompt));
            }
            return Err(GatewayError::Resolution(format!(
                "{} was found, but this host cannot run batch launchers and no {} entry point exists in {}.",
                self.config.launcher,
                self.config.script,
                self.config.root.display()
            )));
        }

        if self.probe.file_exists(&script) {
            tracing::debug!(script = %script.display(), "Resolved script entry point");
            return Ok(self.script_command(prompt));
        }

        Err(GatewayError::Resolution(format!(
            "No backend runner found. Add {} or {} to {}, or set OVERRIDE_BACKEND_CMD to your backend launch command.",
            self.config.script,
            self.config.launcher,
            self.config.root.display()
        )))
    }

    // The launcher is referenced by bare filename from inside `root`, and an
    // empty line is piped in to get past "press any key" pauses. cmd parses
    // this line itself, so every user-supplied word is escaped for it and the
    // arguments are passed through untouched.
    fn batch_command(&self, prompt: &str) -> BackendCommand {
        BackendCommand::new(
            "cmd",
            [
                "/d".to_string(),
                "/c".to_string(),
                "echo.|".to_string(),
                cmd_escape(&self.config.launcher),
                cmd_escape(prompt),
            ],
            prompt,
        )
        .in_dir(&self.config.root)
        .with_raw_args()
    }

    fn script_command(&self, prompt: &str) -> BackendCommand {
        BackendCommand::new(
            self.config.interpreter.clone(),
            [self.config.script.clone(), prompt.to_string()],
            prompt,
        )
        .in_dir(&self.config.root)
    }
}

/// Quote `arg` as one word and caret-escape it for `cmd /c`.
///
/// Embedded quotes are doubled so the word stays whole when the launcher
/// splits its arguments. The quotes themselves are caret-escaped too, which
/// keeps cmd out of quoted mode so every metacharacter escape is honored.
/// Line breaks would end the command, so they become spaces.
fn cmd_escape(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len() * 2 + 4);
    out.push_str("^\"");
    for c in arg.chars() {
        match c {
            '"' => out.push_str("^\"^\""),
            '\r' | '\n' => out.push(' '),
            '^' | '&' | '|' | '<' | '>' | '(' | ')' | '%' | '!' => {
                out.push('^');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push_str("^\"");
    out
}

fn override_command(template: &str, prompt: &str, root: &Path) -> Result<BackendCommand> {
    let tokens = shlex::split(template).ok_or_else(|| {
        GatewayError::Resolution(format!(
            "OVERRIDE_BACKEND_CMD could not be parsed (unbalanced quotes?): {}",
            template
        ))
    })?;

    let mut tokens = tokens.into_iter().map(|token| {
        shellexpand::full(&token)
            .map(|expanded| expanded.into_owned())
            .unwrap_or(token)
    });

    let program = tokens.next().ok_or_else(|| {
        GatewayError::Resolution("OVERRIDE_BACKEND_CMD is set but contains no command".to_string())
    })?;

    let args: Vec<String> = tokens.chain(std::iter::once(prompt.to_string())).collect();
    tracing::debug!(program = %program, args = ?args, "Resolved override command");

    Ok(BackendCommand::new(program, args, prompt).in_dir(root))
}
