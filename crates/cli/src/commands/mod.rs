//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.
//! Commands that talk to a bucket resolve a profile, open a handle through
//! bfs-http and report failures through the shared [`Formatter`].

use clap::{Parser, Subcommand};

use bfs_core::{Bucket, Error, Interrupt, ProfileManager};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod buckets;
mod cat;
pub mod completions;
pub mod cp;
mod ls;
mod profile;
mod rm;

/// bfs - BucketFS CLI Client
///
/// A command-line interface for BucketFS, the flat object store with
/// eventually consistent, cluster-wide synchronization.
#[derive(Parser, Debug)]
#[command(name = "bfs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage bucket profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// List objects and directories in a bucket
    Ls(ls::LsArgs),

    /// List the buckets of a profile's service
    Buckets(buckets::BucketsArgs),

    /// Display object contents
    Cat(cat::CatArgs),

    /// Upload or download an object
    Cp(cp::CpArgs),

    /// Remove an object
    Rm(rm::RmArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli, interrupt: Interrupt) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, output_config).await,
        Commands::Ls(args) => ls::execute(args, output_config).await,
        Commands::Buckets(args) => buckets::execute(args, output_config).await,
        Commands::Cat(args) => cat::execute(args, output_config).await,
        Commands::Cp(args) => cp::execute(args, output_config, interrupt).await,
        Commands::Rm(args) => rm::execute(args, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Exit code matching a core error
pub(crate) fn exit_code_for(error: &Error) -> ExitCode {
    ExitCode::from_i32(error.exit_code()).unwrap_or(ExitCode::GeneralError)
}

/// Report `error` and return its exit code
pub(crate) fn fail(formatter: &Formatter, context: &str, error: &Error) -> ExitCode {
    formatter.error(&format!("{context}: {error}"));
    exit_code_for(error)
}

/// Open a handle for the bucket behind profile `name`
pub(crate) fn open_bucket(
    name: &str,
    formatter: &Formatter,
    interrupt: Interrupt,
) -> Result<Bucket, ExitCode> {
    let manager = ProfileManager::new().map_err(|e| fail(formatter, "Failed to load profiles", &e))?;
    let config = manager
        .config_manager()
        .load()
        .map_err(|e| fail(formatter, "Failed to load configuration", &e))?;
    let profile = manager.get(name).map_err(|e| match e {
        Error::ProfileNotFound(_) => {
            formatter.error(&format!("Profile '{name}' not found"));
            ExitCode::NotFound
        }
        other => fail(formatter, "Failed to load profiles", &other),
    })?;

    bfs_http::connect(&profile, &config.defaults.sync, interrupt)
        .map_err(|e| fail(formatter, "Failed to connect", &e))
}
