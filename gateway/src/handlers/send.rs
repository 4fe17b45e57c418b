//! One-shot command handlers

use anyhow::Result;

use super::CommandContext;
use crate::backend::{validate_prompt, Backend, CommandResolver, InvocationPool, PromptRunner};

/// Handle the `send` command
pub async fn run_send(ctx: &CommandContext, prompt: &str) -> Result<()> {
    let backend = Backend::new(
        CommandResolver::new(ctx.settings.resolver.clone()),
        InvocationPool::unbounded(),
    );
    let response = backend.run(prompt, ctx.settings.request_timeout).await?;
    println!("{}", response);
    Ok(())
}

/// Handle the `resolve` command
pub fn run_resolve(ctx: &CommandContext, prompt: &str) -> Result<()> {
    let prompt = validate_prompt(prompt)?;
    let command = CommandResolver::new(ctx.settings.resolver.clone()).resolve(prompt)?;

    println!("argv: {:?}", command.argv());
    match command.working_dir() {
        Some(dir) => println!("cwd:  {}", dir.display()),
        None => println!("cwd:  (inherited)"),
    }
    Ok(())
}
