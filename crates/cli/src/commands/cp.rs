//! cp command - Upload or download an object
//!
//! Uploads a local file to a bucket, by default waiting until the object is
//! synchronized cluster-wide, or downloads an object to a local file.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use bfs_core::path::{extend_path_to_filename, split_parent};
use bfs_core::{Interrupt, ParsedPath, RemotePath, parse_path};

use super::{fail, open_bucket};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Spinner};

/// Copy objects
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source path (local path or profile/path)
    pub source: String,

    /// Destination path (local path or profile/path)
    pub target: String,

    /// Return once the store accepted the upload, without waiting for synchronization
    #[arg(long)]
    pub no_wait: bool,

    /// Skip the upload of a file over one megabyte whose stored copy has the same SHA-512 checksum
    #[arg(long, conflicts_with = "no_wait")]
    pub if_necessary: bool,
}

#[derive(Debug, Serialize)]
struct CpOutput {
    status: &'static str,
    source: String,
    target: String,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uploaded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    synchronized: Option<bool>,
}

/// Execute the cp command
pub async fn execute(args: CpArgs, output_config: OutputConfig, interrupt: Interrupt) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let source = match parse_path(&args.source) {
        Ok(p) => p,
        Err(e) => return fail(&formatter, "Invalid source path", &e),
    };
    let target = match parse_path(&args.target) {
        Ok(p) => p,
        Err(e) => return fail(&formatter, "Invalid target path", &e),
    };

    match (&source, &target) {
        (ParsedPath::Local(src), ParsedPath::Remote(dst)) => {
            upload(src, dst, &args, &formatter, interrupt).await
        }
        (ParsedPath::Remote(src), ParsedPath::Local(dst)) => {
            download(src, dst, &formatter).await
        }
        (ParsedPath::Remote(_), ParsedPath::Remote(_)) => {
            formatter
                .error("Copying between buckets is not supported. Download and upload instead.");
            ExitCode::UsageError
        }
        (ParsedPath::Local(_), ParsedPath::Local(_)) => {
            formatter.error("Cannot copy between two local paths. Use system cp command.");
            ExitCode::UsageError
        }
    }
}

async fn upload(
    src: &Path,
    dst: &RemotePath,
    args: &CpArgs,
    formatter: &Formatter,
    interrupt: Interrupt,
) -> ExitCode {
    let size = match std::fs::metadata(src) {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        Ok(_) => {
            formatter.error(&format!("Source is not a file: {}", src.display()));
            return ExitCode::UsageError;
        }
        Err(_) => {
            formatter.error(&format!("Source not found: {}", src.display()));
            return ExitCode::NotFound;
        }
    };

    let bucket = match open_bucket(&dst.profile, formatter, interrupt) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };

    let target_path = extend_path_to_filename(src, &dst.path);
    let src_display = src.display().to_string();
    let dst_display = format!("{}/{target_path}", dst.profile);

    let spinner = Spinner::start(
        formatter.config(),
        &if args.no_wait {
            format!("Uploading {src_display}")
        } else {
            format!("Uploading {src_display} and waiting for synchronization")
        },
    );
    let result = if args.if_necessary {
        bucket
            .upload_file_if_necessary(src, &target_path)
            .await
            .map(|result| result.was_upload_necessary)
    } else if args.no_wait {
        bucket
            .upload_file_non_blocking(src, &target_path)
            .await
            .map(|_| true)
    } else {
        bucket.upload_file(src, &target_path).await.map(|_| true)
    };
    spinner.finish_and_clear();

    let uploaded = match result {
        Ok(uploaded) => uploaded,
        Err(e) => return fail(formatter, &format!("Failed to upload {src_display}"), &e),
    };
    let synchronized = uploaded && !args.no_wait;
    let size_human = humansize::format_size(size, humansize::BINARY);

    if formatter.is_json() {
        formatter.json(&CpOutput {
            status: "success",
            source: src_display,
            target: dst_display,
            size_bytes: size,
            size_human,
            uploaded: Some(uploaded),
            synchronized: Some(synchronized),
        });
    } else if !uploaded {
        formatter.println(&format!("{dst_display} is up to date, skipped {src_display}"));
    } else if synchronized {
        formatter.println(&format!(
            "{src_display} -> {dst_display} ({size_human}, synchronized)"
        ));
    } else {
        formatter.println(&format!("{src_display} -> {dst_display} ({size_human})"));
    }
    ExitCode::Success
}

async fn download(src: &RemotePath, dst: &Path, formatter: &Formatter) -> ExitCode {
    if src.is_dir() {
        formatter.error(&format!("'{src}' is not an object path"));
        return ExitCode::UsageError;
    }

    let bucket = match open_bucket(&src.profile, formatter, Interrupt::never()) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };

    let local = local_target(dst, &src.path);
    if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            formatter.error(&format!("Failed to create directory {}: {e}", parent.display()));
            return ExitCode::GeneralError;
        }
    }

    if let Err(e) = bucket.download_file(&src.path, &local).await {
        return fail(formatter, &format!("Failed to download {src}"), &e);
    }

    let size = std::fs::metadata(&local).map(|m| m.len()).unwrap_or_default();
    let size_human = humansize::format_size(size, humansize::BINARY);
    let src_display = src.to_string();
    let dst_display = local.display().to_string();
    if formatter.is_json() {
        formatter.json(&CpOutput {
            status: "success",
            source: src_display,
            target: dst_display,
            size_bytes: size,
            size_human,
            uploaded: None,
            synchronized: None,
        });
    } else {
        formatter.println(&format!("{src_display} -> {dst_display} ({size_human})"));
    }
    ExitCode::Success
}

/// Local file receiving a download of `remote_path`
fn local_target(dst: &Path, remote_path: &str) -> PathBuf {
    let is_dir = dst.is_dir() || dst.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR);
    if is_dir {
        let (_, name) = split_parent(remote_path);
        dst.join(name)
    } else {
        dst.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_path() {
        assert!(parse_path("./file.txt").unwrap().is_local());
        assert!(parse_path("/tmp/file.txt").unwrap().is_local());
    }

    #[test]
    fn test_parse_remote_path() {
        let parsed = parse_path("local/jars/udf.jar").unwrap();
        let remote = parsed.as_remote().unwrap();
        assert_eq!(remote.profile, "local");
        assert_eq!(remote.path, "jars/udf.jar");
    }

    #[test]
    fn test_local_target_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            local_target(dir.path(), "jars/udf.jar"),
            dir.path().join("udf.jar")
        );
    }

    #[test]
    fn test_local_target_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("renamed.jar");
        assert_eq!(local_target(&file, "jars/udf.jar"), file);
    }
}
