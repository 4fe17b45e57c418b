//! Readiness reporting
//!
//! Pure mapping from warm-up state and elapsed time to the status shown to
//! clients.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::WarmupState;

pub const STILL_BOOTING: &str = "Backend is still booting.";
pub const TAKING_LONGER: &str =
    "Backend is taking longer than expected to warm up; requests are allowed.";

/// Point-in-time readiness view. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessSnapshot {
    pub ready: bool,
    pub allow_send: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_seconds: f64,
    pub started_at: DateTime<Utc>,
}

impl ReadinessSnapshot {
    /// Warm-up failed but requests still go through.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReadinessReporter {
    warmup_timeout: Duration,
}

impl ReadinessReporter {
    /// `warmup_timeout` is the grace period before requests are allowed
    /// without a confirmed warm-up.
    pub fn new(warmup_timeout: Duration) -> Self {
        Self { warmup_timeout }
    }

    pub fn warmup_timeout(&self) -> Duration {
        self.warmup_timeout
    }

    pub fn snapshot(&self, state: &WarmupState, now: Instant) -> ReadinessSnapshot {
        let elapsed = now.saturating_duration_since(state.started_at);
        let elapsed_seconds = (elapsed.as_secs_f64() * 10.0).round() / 10.0;

        let (ready, allow_send, message, error) = if state.ready {
            (true, true, None, None)
        } else if let Some(error) = &state.error {
            (false, true, None, Some(error.clone()))
        } else if elapsed >= self.warmup_timeout {
            (false, true, Some(TAKING_LONGER.to_string()), None)
        } else {
            (false, false, Some(STILL_BOOTING.to_string()), None)
        };

        ReadinessSnapshot {
            ready,
            allow_send,
            message,
            error,
            elapsed_seconds,
            started_at: state.started_wall,
        }
    }
}
