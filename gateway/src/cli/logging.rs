//! Tracing setup
//!
//! Logs go to stderr so `gateway send` output stays clean on stdout.
//! `RUST_LOG` wins over the `-v` count; `LOG_FORMAT=json` switches to
//! structured output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Map the `-v` count to a default filter directive
fn default_directive(verbose: u8, floor: &str) -> String {
    let level = match verbose {
        0 => floor,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("{level},backend_gateway={level}")
}

/// Initialize tracing/logging
///
/// `floor` is the level used when no `-v` flag is given (the server logs at
/// `info`, one-shot commands at `warn`).
pub fn init_tracing(verbose: u8, floor: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(verbose, floor))?,
    };

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
