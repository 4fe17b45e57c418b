//! Cap on concurrently running backend processes
//!
//! Waiting for a slot is charged against the caller's own deadline, so a
//! saturated pool surfaces as a timeout rather than an unbounded queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{GatewayError, Result};

#[derive(Clone, Debug)]
pub struct InvocationPool {
    semaphore: Option<Arc<Semaphore>>,
    max: usize,
}

/// Held for the lifetime of one child process.
pub struct PoolSlot {
    _permit: Option<OwnedSemaphorePermit>,
    /// Deadline budget left after waiting for the slot
    pub remaining: Duration,
}

impl InvocationPool {
    /// `max == 0` disables the cap.
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: (max > 0).then(|| Arc::new(Semaphore::new(max))),
            max,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn max(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|_| self.max)
    }

    /// Slots currently free, or None when uncapped.
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Wait for a slot, giving up once `timeout` has elapsed.
    pub async fn acquire(&self, timeout: Duration) -> Result<PoolSlot> {
        let Some(semaphore) = &self.semaphore else {
            return Ok(PoolSlot {
                _permit: None,
                remaining: timeout,
            });
        };

        let started = Instant::now();
        let permit = tokio::time::timeout(timeout, semaphore.clone().acquire_owned())
            .await
            .map_err(|_| {
                tracing::warn!(
                    max = self.max,
                    timeout_secs = timeout.as_secs(),
                    "No backend slot freed up before the deadline"
                );
                GatewayError::Timeout(timeout)
            })?
            .map_err(|e| GatewayError::BackendFailure {
                exit_code: None,
                message: format!("Invocation pool closed: {e}"),
            })?;

        Ok(PoolSlot {
            _permit: Some(permit),
            remaining: timeout.saturating_sub(started.elapsed()),
        })
    }
}
