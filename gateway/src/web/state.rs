//! Shared application state

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{Backend, CommandResolver, InvocationPool, PromptRunner};
use crate::config::Settings;
use crate::warmup::WarmupSupervisor;

#[derive(Clone)]
pub struct AppState {
    /// Readiness state machine; also told about successful requests
    pub supervisor: Arc<WarmupSupervisor>,
    /// Backend used for `/send`
    pub backend: Arc<dyn PromptRunner>,
    /// Per-request deadline
    pub request_timeout: Duration,
    /// Server start time (for health checks)
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        supervisor: Arc<WarmupSupervisor>,
        backend: Arc<dyn PromptRunner>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            supervisor,
            backend,
            request_timeout,
            start_time: Instant::now(),
        }
    }

    /// Build the real backend and supervisor from resolved settings.
    ///
    /// The warm-up probe is not started here; see [`WarmupSupervisor::spawn`].
    pub fn from_settings(settings: &Settings) -> Self {
        let backend: Arc<dyn PromptRunner> = Arc::new(Backend::new(
            CommandResolver::new(settings.resolver.clone()),
            InvocationPool::new(settings.max_concurrent),
        ));
        let supervisor = Arc::new(WarmupSupervisor::new(
            backend.clone(),
            settings.warmup.clone(),
        ));
        Self::new(supervisor, backend, settings.request_timeout)
    }

    /// Get the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
