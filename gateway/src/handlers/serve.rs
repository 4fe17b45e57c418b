//! Serve command handler
//!
//! Kicks off the warm-up probe and starts the web server.

use std::net::SocketAddr;

use anyhow::Result;

use super::CommandContext;
use crate::web::{self, AppState};

/// Handle the `serve` command
pub async fn run_serve(ctx: &CommandContext, open_browser: bool) -> Result<()> {
    let settings = &ctx.settings;
    let state = AppState::from_settings(settings);

    tracing::info!(
        root = %settings.resolver.root.display(),
        override_cmd = settings.resolver.override_cmd.is_some(),
        warmup_timeout_secs = settings.warmup.timeout.as_secs(),
        request_timeout_secs = settings.request_timeout.as_secs(),
        max_concurrent = settings.max_concurrent,
        "Gateway configured"
    );

    // Runs to its terminal state on its own; nothing waits on it
    state.supervisor.spawn();

    let addr = SocketAddr::new(settings.bind, settings.port);
    if open_browser {
        let url = format!("http://localhost:{}", settings.port);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        });
    }

    web::serve(state, addr).await
}
