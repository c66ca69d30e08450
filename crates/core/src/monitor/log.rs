//! Log based synchronization monitor
//!
//! The BucketFS daemon writes one log line per object once it is available
//! cluster-wide: archives are reported as "extracted", everything else as
//! "linked". This monitor scans those logs for a line about the requested
//! path that is not older than the state token.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use regex::Regex;

use crate::error::{Error, Result};
use crate::identity::BucketIdentity;
use crate::path::remove_leading_separator;
use crate::token::{SECOND_RESOLUTION, StateToken};
use crate::traits::SyncMonitor;

/// Archive types the store expands automatically
pub const SUPPORTED_ARCHIVE_EXTENSIONS: [&str; 4] = [".tar", ".tgz", ".tar.gz", ".zip"];

/// Default strptime format of the timestamp in a daemon log line
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%y%m%d %H:%M:%S";

/// Default glob matching the daemon log files
pub const DEFAULT_LOG_FILE_PATTERN: &str = "bucketfsd*.log";

// [I 230502 14:15:16 bucketfsd:215] ...
const LINE_PREFIX: &str = r"^\[\w+ (\d{6} \d{2}:\d{2}:\d{2})";

/// Whether the store expands the object at `path` after upload
pub fn is_supported_archive(path: &str) -> bool {
    SUPPORTED_ARCHIVE_EXTENSIONS
        .iter()
        .any(|extension| path.ends_with(extension))
}

/// Provider of the log lines to scan
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn read_lines(&self) -> Result<Vec<String>>;
}

/// Reads every file in a directory whose name matches a glob pattern
#[derive(Debug, Clone)]
pub struct DirectoryLogSource {
    directory: PathBuf,
    file_pattern: String,
}

impl DirectoryLogSource {
    pub fn new(directory: impl Into<PathBuf>, file_pattern: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_pattern: file_pattern.into(),
        }
    }
}

#[async_trait]
impl LogSource for DirectoryLogSource {
    async fn read_lines(&self) -> Result<Vec<String>> {
        let pattern = self.directory.join(&self.file_pattern);
        let pattern = pattern.to_string_lossy();
        let paths = glob::glob(&pattern)
            .map_err(|e| Error::Config(format!("Invalid log file pattern '{pattern}': {e}")))?;

        let mut lines = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;
            let content = tokio::fs::read_to_string(&path).await?;
            lines.extend(content.lines().map(str::to_string));
        }
        Ok(lines)
    }
}

/// Monitor scanning daemon logs for per-object completion markers
pub struct LogPatternMonitor {
    source: Arc<dyn LogSource>,
    timestamp_format: String,
    line_prefix: Regex,
}

impl LogPatternMonitor {
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self {
            source,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            line_prefix: Regex::new(LINE_PREFIX).expect("static pattern is valid"),
        }
    }

    /// Use a different strptime format for the line timestamps
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Pattern matching the completion line for `path` in `bucket`
    ///
    /// The daemon names objects as `bucket/path`. The name must be delimited
    /// on both sides so that neighbouring objects such as `bucket/xa.txt` or
    /// `bucket/a.txt.bak` do not count for `bucket/a.txt`.
    pub fn object_pattern(bucket: &BucketIdentity, path: &str) -> Result<Regex> {
        let path = remove_leading_separator(path);
        let marker = if is_supported_archive(path) {
            "extracted"
        } else {
            "linked"
        };
        let name = format!("{}/{path}", bucket.bucket);
        Ok(Regex::new(&format!(
            r#"(?:^|[\s/'"]){}(?:[\s'"]|$).*\b{marker}\b"#,
            regex::escape(&name)
        ))?)
    }

    fn line_timestamp(&self, line: &str) -> Option<Timestamp> {
        let captures = self.line_prefix.captures(line)?;
        let text = captures.get(1)?.as_str();
        let local = DateTime::strptime(&self.timestamp_format, text).ok()?;
        local.to_zoned(TimeZone::UTC).ok().map(|zoned| zoned.timestamp())
    }
}

#[async_trait]
impl SyncMonitor for LogPatternMonitor {
    async fn is_synchronized(
        &self,
        bucket: &BucketIdentity,
        path: &str,
        token: &StateToken,
    ) -> Result<bool> {
        let pattern = Self::object_pattern(bucket, path)?;
        let lines = self.source.read_lines().await.map_err(|e| {
            Error::General(format!(
                "Unable to check if object \"{path}\" is synchronized in bucket \"{}\": {e}",
                bucket.fully_qualified_name()
            ))
        })?;

        Ok(lines.iter().any(|line| {
            pattern.is_match(line)
                && self
                    .line_timestamp(line)
                    .is_some_and(|at| token.accepts_instant(at))
        }))
    }

    fn resolution(&self) -> Duration {
        SECOND_RESOLUTION
    }
}
