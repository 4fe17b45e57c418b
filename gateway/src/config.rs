//! Configuration loading
//!
//! Settings come from three layers, highest priority first:
//! 1. CLI flags / environment variables (see `cli::args`)
//! 2. `.gateway.toml`
//! 3. Built-in defaults

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::backend::resolver::{default_interpreter, default_launcher, default_script};
use crate::backend::ResolverConfig;
use crate::warmup::{default_bootstrap_prompt, WarmupConfig};

pub const CONFIG_FILE: &str = ".gateway.toml";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at `<config_dir>/backend-gateway/`
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("backend-gateway").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

// ============================================================================
// File Configuration (.gateway.toml)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct GatewayFileConfig {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Deserialize)]
pub struct BackendSection {
    /// Directory holding the launcher/script; relative paths are resolved
    /// against the config file's directory
    pub root: Option<PathBuf>,
    #[serde(default = "default_launcher")]
    pub launcher: String,
    #[serde(default = "default_script")]
    pub script: String,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    pub override_cmd: Option<String>,
    #[serde(default = "default_bootstrap_prompt")]
    pub bootstrap_prompt: String,
    #[serde(default = "default_warmup_timeout")]
    pub warmup_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
}

fn default_warmup_timeout() -> u64 {
    90
}

fn default_request_timeout() -> u64 {
    300
}

fn default_max_concurrent() -> usize {
    8
}

fn default_port() -> u16 {
    5000
}

fn default_bind() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            root: None,
            launcher: default_launcher(),
            script: default_script(),
            interpreter: default_interpreter(),
            override_cmd: None,
            bootstrap_prompt: default_bootstrap_prompt(),
            warmup_timeout_secs: default_warmup_timeout(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

impl GatewayFileConfig {
    /// Load config from `.gateway.toml`, falling back to defaults when none exists
    pub fn load() -> Result<Self> {
        if let Some(config_path) = find_config_file(CONFIG_FILE) {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No {} found, using defaults", CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: GatewayFileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let (Some(root), Some(base)) = (&config.backend.root, path.parent()) {
            if root.is_relative() {
                config.backend.root = Some(base.join(root));
            }
        }
        Ok(config)
    }
}

// ============================================================================
// Resolved Settings
// ============================================================================

/// Values given on the command line or through the environment
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub root: Option<PathBuf>,
    pub override_cmd: Option<String>,
    pub bootstrap_prompt: Option<String>,
    pub warmup_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_concurrent: Option<usize>,
    pub port: Option<u16>,
    pub bind: Option<IpAddr>,
}

/// Fully resolved configuration handed to the library
#[derive(Debug, Clone)]
pub struct Settings {
    pub resolver: ResolverConfig,
    pub warmup: WarmupConfig,
    pub request_timeout: Duration,
    /// 0 disables the cap
    pub max_concurrent: usize,
    pub port: u16,
    pub bind: IpAddr,
}

impl Settings {
    /// Resolve with priority: CLI/env > config file > defaults
    pub fn resolve(overrides: SettingsOverrides, file: GatewayFileConfig) -> Self {
        let backend = file.backend;
        let root = overrides
            .root
            .or(backend.root)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            resolver: ResolverConfig {
                root,
                launcher: backend.launcher,
                script: backend.script,
                interpreter: backend.interpreter,
                override_cmd: overrides.override_cmd.or(backend.override_cmd),
            },
            warmup: WarmupConfig {
                bootstrap_prompt: overrides
                    .bootstrap_prompt
                    .unwrap_or(backend.bootstrap_prompt),
                timeout: Duration::from_secs(
                    overrides
                        .warmup_timeout_secs
                        .unwrap_or(backend.warmup_timeout_secs),
                ),
            },
            request_timeout: Duration::from_secs(
                overrides
                    .request_timeout_secs
                    .unwrap_or(backend.request_timeout_secs),
            ),
            max_concurrent: overrides.max_concurrent.unwrap_or(backend.max_concurrent),
            port: overrides.port.unwrap_or(file.server.port),
            bind: overrides.bind.unwrap_or(file.server.bind),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(SettingsOverrides::default(), GatewayFileConfig::default())
    }
}
