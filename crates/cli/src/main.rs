//! `fpilot`: drive agent queries, supervised commands and pipeline
//! transitions from a terminal.

mod cli;
mod commands;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    init_tracing();

    Cli::parse().run().await
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG`
/// overrides the default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
