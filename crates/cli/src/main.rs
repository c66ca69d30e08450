//! bfs - BucketFS CLI Client
//!
//! A command-line interface for BucketFS buckets: list, download, upload
//! with synchronization wait, and delete.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod exit_code;
mod output;

use bfs_core::Interrupt;
use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Ctrl+C cancels throttle delays and synchronization waits.
    let (handle, interrupt) = Interrupt::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Received Ctrl+C");
            handle.trigger();
        }
    });

    let exit_code = commands::execute(cli, interrupt).await;
    if exit_code != exit_code::ExitCode::Success {
        tracing::debug!("Exiting with {exit_code}");
    }

    std::process::exit(exit_code.as_i32());
}
