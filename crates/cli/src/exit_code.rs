//! Exit code definitions for bfs CLI
//!
//! Values mirror `bfs_core::Error::exit_code`; scripts depend on them, so
//! changing one is a breaking change.

/// Exit codes for the bfs CLI application.
///
/// These codes follow a consistent convention to allow scripts and automation
/// to handle different error scenarios appropriately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,

    /// General/unspecified error
    GeneralError = 1,

    /// User input error: invalid arguments, malformed path, bad configuration
    UsageError = 2,

    /// Retryable error: connection failure, unexpected status, synchronization timeout
    NetworkError = 3,

    /// Authentication or permission failure
    AuthError = 4,

    /// Resource not found: profile, object or directory does not exist
    NotFound = 5,

    /// Conflict: profile already exists
    Conflict = 6,

    /// Bucket handle lacks write credentials or a synchronization monitor
    UnsupportedFeature = 7,

    /// Operation was interrupted by Ctrl+C
    Interrupted = 130,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create exit code from i32 value
    ///
    /// Returns None if the value doesn't correspond to a known exit code.
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::NetworkError),
            4 => Some(Self::AuthError),
            5 => Some(Self::NotFound),
            6 => Some(Self::Conflict),
            7 => Some(Self::UnsupportedFeature),
            130 => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Get a human-readable description of the exit code
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Operation completed successfully",
            Self::GeneralError => "General error",
            Self::UsageError => "Invalid arguments or path format",
            Self::NetworkError => "Network or synchronization error (retryable)",
            Self::AuthError => "Authentication or permission failure",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Conflict",
            Self::UnsupportedFeature => "Missing credentials or synchronization monitor",
            Self::Interrupted => "Operation interrupted",
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfs_core::{BucketOperation, Error};

    #[test]
    fn test_every_core_error_has_an_exit_code() {
        let errors = [
            (Error::InvalidPath("x".into()), ExitCode::UsageError),
            (Error::Config("x".into()), ExitCode::UsageError),
            (
                Error::Transport {
                    operation: BucketOperation::Upload,
                    uri: "http://h/b/a".into(),
                    status: Some(500),
                    message: "x".into(),
                },
                ExitCode::NetworkError,
            ),
            (
                Error::Timeout {
                    path: "a.txt".into(),
                    bucket: "bfsdefault/default".into(),
                    after: "2024-03-01T10:00:00Z".into(),
                },
                ExitCode::NetworkError,
            ),
            (
                Error::AccessDenied {
                    operation: BucketOperation::Download,
                    uri: "http://h/b/a".into(),
                },
                ExitCode::AuthError,
            ),
            (Error::NotFound("x".into()), ExitCode::NotFound),
            (Error::ProfileNotFound("x".into()), ExitCode::NotFound),
            (Error::ProfileExists("x".into()), ExitCode::Conflict),
            (Error::MissingCapability("x".into()), ExitCode::UnsupportedFeature),
            (Error::Interrupted("x".into()), ExitCode::Interrupted),
            (Error::General("x".into()), ExitCode::GeneralError),
        ];
        for (error, expected) in errors {
            assert_eq!(ExitCode::from_i32(error.exit_code()), Some(expected), "{error}");
        }
    }

    #[test]
    fn test_unknown_exit_code() {
        assert_eq!(ExitCode::from_i32(99), None);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_exit_code_display() {
        let display = ExitCode::UnsupportedFeature.to_string();
        assert!(display.contains("7"));
        assert!(display.contains("synchronization monitor"));

        let display = ExitCode::NotFound.to_string();
        assert!(display.contains("5"));
        assert!(display.contains("not found"));
    }
}
