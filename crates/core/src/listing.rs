//! Directory view over a flat listing
//!
//! BucketFS answers a GET on the bucket root with every object path in the
//! bucket, separated by whitespace. There is no marker for directories; they
//! are inferred from entries sharing a prefix. [`ListingResolver`] fetches
//! that raw listing and reduces it to the entries below a requested path.

use std::collections::BTreeSet;
use std::sync::Arc;

use url::Url;

use crate::error::{BucketOperation, Error, Result, evaluate_status};
use crate::identity::{BucketIdentity, Credentials};
use crate::path::{first_path_component, remove_leading_separator};
use crate::traits::{Transport, TransportRequest};

/// Resolves single-level and recursive listings of a bucket
#[derive(Clone)]
pub struct ListingResolver {
    transport: Arc<dyn Transport>,
}

impl ListingResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// List the contents of `path` in the bucket
    ///
    /// Directories are reported with a trailing separator. Fails with
    /// [`Error::NotFound`] if nothing lives below `path`, since the store
    /// does not tell an empty directory from a missing one.
    pub async fn list(
        &self,
        bucket: &BucketIdentity,
        path: &str,
        recursive: bool,
    ) -> Result<Vec<String>> {
        let uri = bucket.root_uri()?;
        let raw = self.fetch(uri.clone(), &bucket.read_credentials()).await?;
        let entries = resolve_listing(&raw, path, recursive);
        if entries.is_empty() {
            return Err(Error::NotFound(format!(
                "Unable to list contents of '{path}' in bucket {uri}: No such file or directory"
            )));
        }
        Ok(entries)
    }

    /// List the buckets of the service hosting `bucket`
    pub async fn list_buckets(&self, bucket: &BucketIdentity) -> Result<Vec<String>> {
        let uri = bucket.service_uri()?;
        let raw = self.fetch(uri.clone(), &Credentials::read("")).await?;
        let buckets: Vec<String> = raw
            .split_whitespace()
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if buckets.is_empty() {
            return Err(Error::NotFound(format!(
                "Unable to list buckets of {uri}: No such file or directory"
            )));
        }
        Ok(buckets)
    }

    async fn fetch(&self, uri: Url, credentials: &Credentials) -> Result<String> {
        tracing::debug!("Listing contents of URI '{uri}'");
        let response = self
            .transport
            .send(TransportRequest::get(uri.clone(), credentials))
            .await?;
        evaluate_status(uri.as_str(), BucketOperation::List, response.status)?;
        Ok(response.text())
    }
}

/// Reduce a raw whitespace separated listing to the entries below `path`
///
/// The prefix match is a plain string match, so a file named exactly like
/// the prefix is kept next to the children of the directory of that name.
/// The result is deduplicated and sorted.
pub fn resolve_listing(raw: &str, path: &str, recursive: bool) -> Vec<String> {
    let prefix = remove_leading_separator(path);
    raw.split_whitespace()
        .filter(|entry| entry.starts_with(prefix))
        .map(|entry| remove_leading_separator(&entry[prefix.len()..]))
        .map(|rest| {
            if recursive {
                rest
            } else {
                first_path_component(rest)
            }
        })
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
