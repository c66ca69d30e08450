//! Synchronization monitors
//!
//! Two interchangeable implementations of [`SyncMonitor`]: one scanning the
//! daemon logs, one asking a status endpoint. The upload coordinator never
//! knows which one is active.

mod api;
mod log;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use api::ApiStatusMonitor;
pub use log::{
    DEFAULT_LOG_FILE_PATTERN, DEFAULT_TIMESTAMP_FORMAT, DirectoryLogSource, LogPatternMonitor,
    LogSource, SUPPORTED_ARCHIVE_EXTENSIONS, is_supported_archive,
};

use crate::traits::{SyncMonitor, Transport};

fn default_file_pattern() -> String {
    DEFAULT_LOG_FILE_PATTERN.to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

/// Monitor selection of a bucket profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MonitorConfig {
    /// Uploads cannot wait for synchronization
    #[default]
    None,

    /// Scan daemon log files
    Log {
        directory: PathBuf,
        #[serde(default = "default_file_pattern")]
        file_pattern: String,
        #[serde(default = "default_timestamp_format")]
        timestamp_format: String,
    },

    /// Query a status endpoint
    Api { endpoint: String },
}

impl MonitorConfig {
    /// Build the configured monitor, if any
    pub fn build(&self, transport: Arc<dyn Transport>) -> Option<Arc<dyn SyncMonitor>> {
        match self {
            MonitorConfig::None => None,
            MonitorConfig::Log {
                directory,
                file_pattern,
                timestamp_format,
            } => {
                let source = DirectoryLogSource::new(directory.clone(), file_pattern.clone());
                Some(Arc::new(
                    LogPatternMonitor::new(Arc::new(source))
                        .with_timestamp_format(timestamp_format.clone()),
                ))
            }
            MonitorConfig::Api { endpoint } => {
                Some(Arc::new(ApiStatusMonitor::new(transport, endpoint.clone())))
            }
        }
    }
}
