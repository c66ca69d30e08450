//! Collaborator trait definitions
//!
//! [`Transport`] issues raw requests against the store and [`SyncMonitor`]
//! tells whether an object has been synchronized. Both are injected into the
//! bucket handle so the core stays independent of any HTTP client, and both
//! can be replaced by fakes in tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::identity::{BucketIdentity, Credentials};
use crate::token::{SECOND_RESOLUTION, StateToken};

/// HTTP method understood by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A single request to the store
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub uri: Url,
    /// Value of the `Authorization` header
    pub authorization: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    pub fn get(uri: Url, credentials: &Credentials) -> Self {
        Self {
            method: Method::Get,
            uri,
            authorization: Some(credentials.authorization_header()),
            body: None,
        }
    }

    pub fn put(uri: Url, credentials: &Credentials, body: Vec<u8>) -> Self {
        Self {
            method: Method::Put,
            uri,
            authorization: Some(credentials.authorization_header()),
            body: Some(body),
        }
    }

    pub fn delete(uri: Url, credentials: &Credentials) -> Self {
        Self {
            method: Method::Delete,
            uri,
            authorization: Some(credentials.authorization_header()),
            body: None,
        }
    }

    /// A request without authentication, e.g. for a status endpoint
    pub fn anonymous_get(uri: Url) -> Self {
        Self {
            method: Method::Get,
            uri,
            authorization: None,
            body: None,
        }
    }
}

/// Status and body returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Raw request/response exchange with the store
///
/// Implementations return any HTTP status as a response and fail only on I/O
/// problems ([`crate::Error::Transport`]) or cancellation
/// ([`crate::Error::Interrupted`]). No implementation retries on its own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Observes whether an uploaded object has been synchronized
///
/// Implementations must only report `true` for an event that the given
/// token accepts, so that a stale signal from an earlier upload to the same
/// path is never mistaken for the current one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncMonitor: Send + Sync {
    /// Check if the object at `path` was synchronized at or after `token`
    async fn is_synchronized(
        &self,
        bucket: &BucketIdentity,
        path: &str,
        token: &StateToken,
    ) -> Result<bool>;

    /// Finest time difference this monitor can tell apart
    ///
    /// Tokens are truncated to it and repeated uploads to the same path are
    /// spaced by it.
    fn resolution(&self) -> Duration {
        SECOND_RESOLUTION
    }
}
