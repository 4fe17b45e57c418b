use anyhow::Result;
use clap::Parser;

use backend_gateway::cli::{init_tracing, Cli, Commands};
use backend_gateway::handlers::{self, CommandContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let floor = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(cli.verbose, floor)?;

    let ctx = CommandContext::from_cli(&cli)?;

    match &cli.command {
        Commands::Serve { open, .. } => handlers::run_serve(&ctx, *open).await?,
        Commands::Send { prompt } => handlers::run_send(&ctx, prompt).await?,
        Commands::Resolve { prompt } => handlers::run_resolve(&ctx, prompt)?,
    }

    Ok(())
}
