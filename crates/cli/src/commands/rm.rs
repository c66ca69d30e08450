//! rm command - Remove objects
//!
//! Deletes one or more objects. BucketFS has no directories to remove;
//! a path ending with a separator is rejected.

use clap::Args;
use serde::Serialize;

use bfs_core::{Interrupt, parse_remote_path};

use super::{exit_code_for, open_bucket};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Object path(s) to remove (profile/path)
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
    total: usize,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    let mut exit_code = ExitCode::Success;

    for path in &args.paths {
        match remove(path, &formatter).await {
            Ok(()) => {
                if !formatter.is_json() {
                    formatter.println(&format!("Removed '{path}'"));
                }
                deleted.push(path.clone());
            }
            Err(code) => {
                failed.push(path.clone());
                if code == ExitCode::UsageError || code == ExitCode::AuthError {
                    return code;
                }
                exit_code = code;
            }
        }
    }

    if formatter.is_json() {
        formatter.json(&RmOutput {
            status: if failed.is_empty() { "success" } else { "partial" },
            total: deleted.len() + failed.len(),
            deleted,
            failed,
        });
    }
    exit_code
}

async fn remove(path: &str, formatter: &Formatter) -> Result<(), ExitCode> {
    let remote = parse_remote_path(path).map_err(|e| {
        formatter.error(&format!("Invalid path: {e}"));
        ExitCode::UsageError
    })?;
    if remote.is_dir() {
        formatter.error(&format!("'{path}' is not an object path"));
        return Err(ExitCode::UsageError);
    }

    let bucket = open_bucket(&remote.profile, formatter, Interrupt::never())?;
    bucket.delete(&remote.path).await.map_err(|e| {
        formatter.error(&format!("Failed to remove '{path}': {e}"));
        exit_code_for(&e)
    })
}
