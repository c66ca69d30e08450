//! Upload-necessity strategies
//!
//! Decide whether a local file has to be uploaded at all, e.g. because an
//! identical object already sits at the destination.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha512};

use crate::error::{BucketOperation, Error, Result, evaluate_status};
use crate::identity::BucketIdentity;
use crate::listing::ListingResolver;
use crate::path::split_parent;
use crate::traits::{Transport, TransportRequest};

/// Files up to this size (one megabyte) are uploaded without comparing checksums
pub const CHECKSUM_SIZE_THRESHOLD: u64 = 1_000_000;

fn sha512_hex(content: &[u8]) -> String {
    hex::encode(Sha512::digest(content))
}

/// Strategy deciding if uploading `local` to `path` is required
#[async_trait]
pub trait UploadNecessityCheck: Send + Sync {
    async fn is_upload_necessary(
        &self,
        local: &Path,
        path: &str,
        bucket: &BucketIdentity,
    ) -> Result<bool>;
}

/// Uploads unconditionally
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadAlways;

#[async_trait]
impl UploadNecessityCheck for UploadAlways {
    async fn is_upload_necessary(
        &self,
        _local: &Path,
        _path: &str,
        _bucket: &BucketIdentity,
    ) -> Result<bool> {
        Ok(true)
    }
}

/// Supplier of the SHA-512 (lowercase hex) of a remote object
#[async_trait]
pub trait RemoteChecksum: Send + Sync {
    async fn sha512(&self, bucket: &BucketIdentity, path: &str) -> Result<String>;
}

/// Computes the checksum of a remote object by downloading it
pub struct DownloadChecksum {
    transport: Arc<dyn Transport>,
}

impl DownloadChecksum {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl RemoteChecksum for DownloadChecksum {
    async fn sha512(&self, bucket: &BucketIdentity, path: &str) -> Result<String> {
        let uri = bucket.object_uri(path)?;
        tracing::debug!("Downloading \"{uri}\" to compute its checksum");
        let response = self
            .transport
            .send(TransportRequest::get(uri.clone(), &bucket.read_credentials()))
            .await?;
        evaluate_status(uri.as_str(), BucketOperation::Download, response.status)?;
        Ok(sha512_hex(&response.body))
    }
}

/// Skips large files whose remote copy has the same SHA-512
pub struct ChecksumUploadCheck {
    listing: ListingResolver,
    checksum: Arc<dyn RemoteChecksum>,
}

impl ChecksumUploadCheck {
    pub fn new(listing: ListingResolver, checksum: Arc<dyn RemoteChecksum>) -> Self {
        Self { listing, checksum }
    }

    async fn check(&self, local: &Path, path: &str, bucket: &BucketIdentity) -> Result<bool> {
        let size = tokio::fs::metadata(local).await?.len();
        if size <= CHECKSUM_SIZE_THRESHOLD {
            return Ok(true);
        }

        let (parent, name) = split_parent(path);
        let siblings = match self.listing.list(bucket, parent, false).await {
            Ok(entries) => entries,
            Err(Error::NotFound(_)) => return Ok(true),
            Err(e) => return Err(e),
        };
        if !siblings.iter().any(|entry| entry == name) {
            return Ok(true);
        }

        let content = tokio::fs::read(local).await?;
        let local_checksum = sha512_hex(&content);
        let remote_checksum = self.checksum.sha512(bucket, path).await?;
        tracing::debug!(
            "Checksum of \"{}\": local {local_checksum}, remote {remote_checksum}",
            local.display()
        );
        Ok(!local_checksum.eq_ignore_ascii_case(remote_checksum.trim()))
    }
}

#[async_trait]
impl UploadNecessityCheck for ChecksumUploadCheck {
    async fn is_upload_necessary(
        &self,
        local: &Path,
        path: &str,
        bucket: &BucketIdentity,
    ) -> Result<bool> {
        self.check(local, path, bucket).await.map_err(|e| {
            Error::General(format!(
                "Failed to check if we need to upload {} to {} in bucket {}: {e}",
                local.display(),
                path,
                bucket.fully_qualified_name()
            ))
        })
    }
}
