//! Backend invocation
//!
//! [`Backend`] ties resolution, the invocation pool, and process execution
//! together behind [`PromptRunner`], the one seam used by both the warm-up
//! probe and user requests.

pub mod command;
pub mod invoker;
pub mod pool;
pub mod resolver;

pub use command::{BackendCommand, InvocationResult, EMPTY_RESPONSE_PLACEHOLDER};
pub use invoker::{ProcessInvoker, SystemInvoker};
pub use pool::InvocationPool;
pub use resolver::{CommandResolver, HostProbe, ResolverConfig, SystemProbe};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GatewayError, Result};

/// Sends one prompt to the backend and returns its response text.
#[async_trait]
pub trait PromptRunner: Send + Sync {
    async fn run(&self, prompt: &str, timeout: Duration) -> Result<String>;
}

/// Trim a user prompt, rejecting it if nothing is left.
pub fn validate_prompt(prompt: &str) -> Result<&str> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(GatewayError::Validation("Prompt cannot be empty.".to_string()));
    }
    Ok(prompt)
}

/// The real backend: resolve, wait for a slot, spawn.
pub struct Backend {
    resolver: CommandResolver,
    invoker: Arc<dyn ProcessInvoker>,
    pool: InvocationPool,
}

impl Backend {
    pub fn new(resolver: CommandResolver, pool: InvocationPool) -> Self {
        Self::with_invoker(resolver, pool, Arc::new(SystemInvoker))
    }

    pub fn with_invoker(
        resolver: CommandResolver,
        pool: InvocationPool,
        invoker: Arc<dyn ProcessInvoker>,
    ) -> Self {
        Self {
            resolver,
            invoker,
            pool,
        }
    }

    pub fn resolver(&self) -> &CommandResolver {
        &self.resolver
    }

    pub fn pool(&self) -> &InvocationPool {
        &self.pool
    }
}

#[async_trait]
impl PromptRunner for Backend {
    async fn run(&self, prompt: &str, timeout: Duration) -> Result<String> {
        let prompt = validate_prompt(prompt)?;
        let command = self.resolver.resolve(prompt)?;
        let slot = self.pool.acquire(timeout).await?;
        self.invoker.invoke(&command, slot.remaining).await
    }
}
