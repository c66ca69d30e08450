//! ls command - List objects and directories
//!
//! Lists the entries directly below a path, or every object below it with
//! `--recursive`. Directories are shown with a trailing separator.

use clap::Args;
use serde::Serialize;

use bfs_core::{Interrupt, parse_remote_path};

use super::{fail, open_bucket};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List objects and directories
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote path (profile or profile/path)
    pub path: String,

    /// List recursively
    #[arg(short, long)]
    pub recursive: bool,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    path: String,
    recursive: bool,
    items: Vec<String>,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let remote = match parse_remote_path(&args.path) {
        Ok(remote) => remote,
        Err(e) => return fail(&formatter, "Invalid path", &e),
    };
    let bucket = match open_bucket(&remote.profile, &formatter, Interrupt::never()) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };

    let listing = if args.recursive {
        bucket.list_contents_recursively(&remote.path).await
    } else {
        bucket.list_contents(&remote.path).await
    };
    let items = match listing {
        Ok(items) => items,
        Err(e) => return fail(&formatter, "Failed to list contents", &e),
    };

    if formatter.is_json() {
        formatter.json(&LsOutput {
            path: args.path,
            recursive: args.recursive,
            items,
        });
    } else {
        formatter.entries(&items);
    }
    ExitCode::Success
}
