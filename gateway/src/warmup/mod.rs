//! Warm-up supervision
//!
//! One [`WarmupSupervisor`] per process owns the readiness state machine:
//!
//! ```text
//! Booting ──probe ok──────▶ Ready
//!    │                        ▲
//!    └──probe failed──▶ Failed ┘ (successful real request)
//! ```
//!
//! The lock only guards check-and-set transitions. The probe itself runs
//! outside it, so status reads never wait on a slow backend.

pub mod readiness;

pub use readiness::{ReadinessReporter, ReadinessSnapshot};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::backend::PromptRunner;

/// Shared readiness record. Readers only ever see clones.
#[derive(Debug, Clone)]
pub struct WarmupState {
    pub ready: bool,
    pub error: Option<String>,
    pub started_at: Instant,
    pub started_wall: DateTime<Utc>,
    /// A bootstrap probe is currently running
    pub probing: bool,
}

impl WarmupState {
    pub fn new() -> Self {
        Self {
            ready: false,
            error: None,
            started_at: Instant::now(),
            started_wall: Utc::now(),
            probing: false,
        }
    }
}

impl Default for WarmupState {
    fn default() -> Self {
        Self::new()
    }
}

/// Warm-up probe settings
#[derive(Debug, Clone)]
pub struct WarmupConfig {
    pub bootstrap_prompt: String,
    /// Probe deadline, also the grace period before degrading to allow-send
    pub timeout: Duration,
}

pub fn default_bootstrap_prompt() -> String {
    "Hello! Reply with a short greeting.".to_string()
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            bootstrap_prompt: default_bootstrap_prompt(),
            timeout: Duration::from_secs(90),
        }
    }
}

pub struct WarmupSupervisor {
    state: Mutex<WarmupState>,
    runner: Arc<dyn PromptRunner>,
    config: WarmupConfig,
    reporter: ReadinessReporter,
}

impl WarmupSupervisor {
    pub fn new(runner: Arc<dyn PromptRunner>, config: WarmupConfig) -> Self {
        let reporter = ReadinessReporter::new(config.timeout);
        Self {
            state: Mutex::new(WarmupState::new()),
            runner,
            config,
            reporter,
        }
    }

    fn lock(&self) -> MutexGuard<'_, WarmupState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock still holds valid data.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run the bootstrap probe on a background task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            supervisor.start_warmup().await;
        })
    }

    /// Run the bootstrap probe unless the backend is already ready or a
    /// probe is in flight. Returns whether this call ran the probe.
    pub async fn start_warmup(&self) -> bool {
        {
            let mut state = self.lock();
            if state.ready || state.probing {
                return false;
            }
            state.probing = true;
            state.error = None;
            state.started_at = Instant::now();
            state.started_wall = Utc::now();
        }

        tracing::info!(
            timeout_secs = self.config.timeout.as_secs(),
            "Starting backend warm-up"
        );

        let outcome = self
            .runner
            .run(&self.config.bootstrap_prompt, self.config.timeout)
            .await;

        let mut state = self.lock();
        state.probing = false;
        match outcome {
            Ok(_) => {
                state.ready = true;
                state.error = None;
                tracing::info!(
                    elapsed_secs = state.started_at.elapsed().as_secs(),
                    "Backend warm-up complete"
                );
            }
            Err(e) if !state.ready => {
                tracing::warn!(error = %e, "Backend warm-up failed; requests remain allowed");
                state.error = Some(e.to_string());
            }
            Err(e) => {
                tracing::debug!(error = %e, "Warm-up probe failed after a request confirmed readiness");
            }
        }
        true
    }

    /// Record that a real request succeeded. Stronger evidence than the probe.
    pub fn mark_ready(&self) {
        let mut state = self.lock();
        if !state.ready {
            tracing::info!("Backend confirmed ready by a successful request");
        }
        state.ready = true;
        state.error = None;
    }

    pub fn state(&self) -> WarmupState {
        self.lock().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    pub fn snapshot(&self) -> ReadinessSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> ReadinessSnapshot {
        let state = self.state();
        self.reporter.snapshot(&state, now)
    }
}
