//! Bucket identity and addressing
//!
//! A [`BucketIdentity`] names one bucket of one BucketFS service and carries
//! the credentials used to read from and write to it.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::path::{PATH_SEPARATOR, remove_leading_separator};

/// Name of the default BucketFS service
pub const DEFAULT_SERVICE: &str = "bfsdefault";

/// Name of the default bucket
pub const DEFAULT_BUCKET: &str = "default";

/// Wire protocol of a BucketFS service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(crate::error::Error::Config(format!(
                "Unsupported protocol '{other}'. Use http or https."
            ))),
        }
    }
}

/// HTTP Basic credentials for one access mode of a bucket
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: &'static str,
    password: String,
}

impl Credentials {
    /// Credentials of the read user
    pub fn read(password: impl Into<String>) -> Self {
        Self {
            user: "r",
            password: password.into(),
        }
    }

    /// Credentials of the write user
    pub fn write(password: impl Into<String>) -> Self {
        Self {
            user: "w",
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        self.user
    }

    /// Value of the `Authorization` header
    pub fn authorization_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Immutable address and credentials of one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketIdentity {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub service: String,
    pub bucket: String,
    pub read_password: String,
    pub write_password: Option<String>,
}

impl BucketIdentity {
    /// Create an identity for a read-only bucket on the default service
    pub fn new(host: impl Into<String>, port: u16, bucket: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Http,
            host: host.into(),
            port,
            service: DEFAULT_SERVICE.to_string(),
            bucket: bucket.into(),
            read_password: String::new(),
            write_password: None,
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_read_password(mut self, password: impl Into<String>) -> Self {
        self.read_password = password.into();
        self
    }

    pub fn with_write_password(mut self, password: impl Into<String>) -> Self {
        self.write_password = Some(password.into());
        self
    }

    /// `service/bucket`
    pub fn fully_qualified_name(&self) -> String {
        format!("{}{PATH_SEPARATOR}{}", self.service, self.bucket)
    }

    /// Root of the service, listing its buckets
    pub fn service_uri(&self) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}://{}:{}/",
            self.protocol, self.host, self.port
        ))?)
    }

    /// Root of the bucket, listing its objects
    pub fn root_uri(&self) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}://{}:{}/{}/",
            self.protocol, self.host, self.port, self.bucket
        ))?)
    }

    /// URI of one object in the bucket
    ///
    /// Every component of `path_in_bucket` becomes one percent-encoded path
    /// segment below [`root_uri`](Self::root_uri).
    pub fn object_uri(&self, path_in_bucket: &str) -> Result<Url> {
        append_path(self.root_uri()?, path_in_bucket)
    }

    /// Path under which user defined functions see an object
    pub fn path_in_udf(&self, path_in_bucket: &str) -> String {
        let path = remove_leading_separator(path_in_bucket);
        if path.is_empty() {
            format!("/buckets/{}/{}", self.service, self.bucket)
        } else {
            format!("/buckets/{}/{}/{path}", self.service, self.bucket)
        }
    }

    pub fn read_credentials(&self) -> Credentials {
        Credentials::read(self.read_password.clone())
    }

    /// Write credentials, if the identity was configured with a write password
    pub fn write_credentials(&self) -> Option<Credentials> {
        self.write_password.clone().map(Credentials::write)
    }
}

/// Append the components of `path` to `base` as separate path segments
///
/// Reserved characters such as `?` and `#` are percent-encoded. `.` and `..`
/// components are rejected since they would address another location.
pub(crate) fn append_path(mut base: Url, path: &str) -> Result<Url> {
    let path = remove_leading_separator(path);
    if path
        .split(PATH_SEPARATOR)
        .any(|segment| segment == "." || segment == "..")
    {
        return Err(Error::InvalidPath(format!(
            "Path \"{path}\" must not contain '.' or '..' components"
        )));
    }
    if base.cannot_be_a_base() {
        return Err(Error::InvalidPath(format!("Cannot append a path to {base}")));
    }
    if let Ok(mut segments) = base.path_segments_mut() {
        segments.pop_if_empty().extend(path.split(PATH_SEPARATOR));
    }
    Ok(base)
}

impl fmt::Display for BucketIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}/{}",
            self.protocol,
            self.host,
            self.port,
            self.fully_qualified_name()
        )
    }
}
