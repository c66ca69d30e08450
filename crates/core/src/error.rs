//! Error types for bfs-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use std::fmt;

use thiserror::Error;

/// Result type alias for bfs-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of request issued against a bucket, carried in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketOperation {
    Download,
    List,
    Upload,
    Delete,
}

impl fmt::Display for BucketOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BucketOperation::Download => "download",
            BucketOperation::List => "list",
            BucketOperation::Upload => "upload",
            BucketOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Error types for bfs-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile already exists
    #[error("Profile already exists: {0}")]
    ProfileExists(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Log pattern could not be compiled
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// HTTP 403 from the store
    #[error("Access denied trying to {operation} {uri}")]
    AccessDenied {
        operation: BucketOperation,
        uri: String,
    },

    /// HTTP 404 from the store, or an empty filtered listing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected status or I/O failure on the wire
    #[error("Unable to {operation} {uri}: {message}")]
    Transport {
        operation: BucketOperation,
        uri: String,
        status: Option<u16>,
        message: String,
    },

    /// A wait was cancelled by the caller
    #[error("Interrupted: {0}")]
    Interrupted(String),

    /// Synchronization did not happen within the configured bound
    #[error(
        "Timeout waiting for object \"{path}\" to be synchronized in bucket \"{bucket}\" after {after}"
    )]
    Timeout {
        path: String,
        bucket: String,
        after: String,
    },

    /// Local content could not be read before uploading
    #[error("Content unavailable: {description}: {source}")]
    ContentUnavailable {
        description: String,
        #[source]
        source: std::io::Error,
    },

    /// The store rejected an upload
    #[error("Unable to upload {target} (HTTP status {status})")]
    UploadFailed { status: u16, target: String },

    /// The bucket handle lacks what the operation needs
    #[error("Missing capability: {0}")]
    MissingCapability(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,                              // UsageError
            Error::Config(_) => 2,                                   // UsageError
            Error::Transport { .. } | Error::Timeout { .. } => 3,    // NetworkError
            Error::AccessDenied { .. } => 4,                         // AuthError
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5,     // NotFound
            Error::ProfileExists(_) => 6,                            // Conflict
            Error::MissingCapability(_) => 7,                        // UnsupportedFeature
            Error::Interrupted(_) => 130,                            // Interrupted
            _ => 1,                                                  // GeneralError
        }
    }

    /// HTTP status attached to this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::AccessDenied { .. } => Some(403),
            Error::Transport { status, .. } => *status,
            Error::UploadFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Map an HTTP status returned by the store to the matching error kind
pub fn evaluate_status(uri: &str, operation: BucketOperation, status: u16) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        403 => Err(Error::AccessDenied {
            operation,
            uri: uri.to_string(),
        }),
        404 => Err(Error::NotFound(format!(
            "File or directory not found trying to {operation} {uri}"
        ))),
        _ => Err(Error::Transport {
            operation,
            uri: uri.to_string(),
            status: Some(status),
            message: format!("HTTP status {status}"),
        }),
    }
}
