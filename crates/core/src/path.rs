//! Path parsing and resolution
//!
//! BucketFS has a flat namespace: an object path is just a string that may
//! contain separators. This module holds the string helpers shared by the
//! listing and upload code, and the parser for the CLI's `profile/path`
//! notation. Local paths are passed through as-is.

use std::path::Path;

use crate::error::{Error, Result};

/// Separator between path components inside a bucket
pub const PATH_SEPARATOR: &str = "/";

/// Strip a single leading separator
pub fn remove_leading_separator(path: &str) -> &str {
    path.strip_prefix(PATH_SEPARATOR).unwrap_or(path)
}

/// Reduce a relative path to its first component
///
/// Directories keep a trailing separator so they stay distinguishable from a
/// file with the same name.
pub fn first_path_component(path: &str) -> &str {
    match path.find(PATH_SEPARATOR) {
        Some(index) => &path[..=index],
        None => path,
    }
}

/// Append the local file name when the destination denotes a directory
pub fn extend_path_to_filename(local_path: &Path, path_in_bucket: &str) -> String {
    if path_in_bucket.ends_with(PATH_SEPARATOR) {
        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{path_in_bucket}{file_name}")
    } else {
        path_in_bucket.to_string()
    }
}

/// Split a path into its parent directory and final component
pub fn split_parent(path: &str) -> (&str, &str) {
    let path = remove_leading_separator(path);
    match path.rfind(PATH_SEPARATOR) {
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

/// A parsed remote path pointing into a configured bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Profile name
    pub profile: String,
    /// Path inside the bucket (empty for bucket root)
    pub path: String,
}

impl RemotePath {
    /// Create a new RemotePath
    pub fn new(profile: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            path: path.into(),
        }
    }

    /// Whether the path ends with a separator (directory semantics)
    pub fn is_dir(&self) -> bool {
        self.path.is_empty() || self.path.ends_with(PATH_SEPARATOR)
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.profile)
        } else {
            write!(f, "{}/{}", self.profile, self.path)
        }
    }
}

/// Parsed path that can be either local or remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPath {
    /// Local filesystem path
    Local(std::path::PathBuf),
    /// Path inside a bucket
    Remote(RemotePath),
}

impl ParsedPath {
    /// Check if this is a remote path
    pub fn is_remote(&self) -> bool {
        matches!(self, ParsedPath::Remote(_))
    }

    /// Check if this is a local path
    pub fn is_local(&self) -> bool {
        matches!(self, ParsedPath::Local(_))
    }

    /// Get the remote path if this is a remote path
    pub fn as_remote(&self) -> Option<&RemotePath> {
        match self {
            ParsedPath::Remote(p) => Some(p),
            ParsedPath::Local(_) => None,
        }
    }

    /// Get the local path if this is a local path
    pub fn as_local(&self) -> Option<&std::path::PathBuf> {
        match self {
            ParsedPath::Local(p) => Some(p),
            ParsedPath::Remote(_) => None,
        }
    }
}

/// Parse a path string into a ParsedPath
///
/// Remote paths have the format: profile/[path]
/// Local paths are anything that:
/// - Starts with / (absolute path)
/// - Starts with ./ or ../ (relative path)
/// - Contains no / (file in current directory)
/// - Or doesn't start with a valid profile name
pub fn parse_path(path: &str) -> Result<ParsedPath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    if path.starts_with('/') || path.starts_with("./") || path.starts_with("../") {
        return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
    }

    #[cfg(windows)]
    if path.len() >= 2 && path.chars().nth(1) == Some(':') {
        return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
    }

    match path.split_once('/') {
        Some((profile, rest)) if is_valid_profile_name(profile) => {
            Ok(ParsedPath::Remote(RemotePath::new(profile, rest)))
        }
        _ => Ok(ParsedPath::Local(std::path::PathBuf::from(path))),
    }
}

/// Parse a path that must point into a bucket
///
/// A bare profile name addresses the bucket root.
pub fn parse_remote_path(path: &str) -> Result<RemotePath> {
    if is_valid_profile_name(path) {
        return Ok(RemotePath::new(path, ""));
    }
    match parse_path(path)? {
        ParsedPath::Remote(remote) => Ok(remote),
        ParsedPath::Local(_) => Err(Error::InvalidPath(format!(
            "'{path}' is not a bucket path. Use format: profile/[path]"
        ))),
    }
}

/// Check if a string is a valid profile name
pub fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
