//! buckets command - List the buckets of a service

use clap::Args;
use serde::Serialize;

use bfs_core::Interrupt;

use super::{fail, open_bucket};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List buckets
#[derive(Args, Debug)]
pub struct BucketsArgs {
    /// Profile whose service is listed
    pub profile: String,
}

#[derive(Debug, Serialize)]
struct BucketsOutput {
    service: String,
    buckets: Vec<String>,
}

/// Execute the buckets command
pub async fn execute(args: BucketsArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let bucket = match open_bucket(&args.profile, &formatter, Interrupt::never()) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };

    match bucket.list_buckets().await {
        Ok(buckets) => {
            if formatter.is_json() {
                formatter.json(&BucketsOutput {
                    service: bucket.identity().service.clone(),
                    buckets,
                });
            } else {
                formatter.entries(&buckets);
            }
            ExitCode::Success
        }
        Err(e) => fail(&formatter, "Failed to list buckets", &e),
    }
}
