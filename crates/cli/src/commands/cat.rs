//! cat command - Display object contents
//!
//! Outputs the entire content of an object to stdout.

use std::io::{self, Write};

use clap::Args;

use bfs_core::{Interrupt, parse_remote_path};

use super::{fail, open_bucket};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Display object contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Object path (profile/path)
    pub path: String,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let remote = match parse_remote_path(&args.path) {
        Ok(remote) if !remote.is_dir() => remote,
        Ok(_) => {
            formatter.error(&format!(
                "Invalid path format: '{}'. Expected: profile/path",
                args.path
            ));
            return ExitCode::UsageError;
        }
        Err(e) => return fail(&formatter, "Invalid path", &e),
    };
    let bucket = match open_bucket(&remote.profile, &formatter, Interrupt::never()) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };

    match bucket.download_as_bytes(&remote.path).await {
        Ok(data) => {
            // Bypass the formatter to keep binary content intact.
            if let Err(e) = io::stdout().write_all(&data) {
                formatter.error(&format!("Failed to write to stdout: {e}"));
                return ExitCode::GeneralError;
            }
            ExitCode::Success
        }
        Err(e) => fail(&formatter, "Failed to get object", &e),
    }
}
