//! Bucket handle construction from configuration

use std::sync::Arc;

use bfs_core::{
    Bucket, BucketProfile, ChecksumUploadCheck, DownloadChecksum, Interrupt, ListingResolver, Result,
    SyncDefaults, Transport,
};

use crate::transport::ReqwestTransport;

/// Open a handle for the bucket described by `profile`
///
/// The profile's monitor is attached when configured; its status API, if
/// any, is queried through the same transport as the bucket itself.
/// Conditional uploads compare SHA-512 checksums against the stored object.
pub fn connect(profile: &BucketProfile, sync: &SyncDefaults, interrupt: Interrupt) -> Result<Bucket> {
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(profile.insecure)?);
    let mut bucket = Bucket::new(profile.to_identity(), transport.clone())
        .with_sync_policy(sync.policy()?)
        .with_interrupt(interrupt)
        .with_upload_check(Arc::new(ChecksumUploadCheck::new(
            ListingResolver::new(transport.clone()),
            Arc::new(DownloadChecksum::new(transport.clone())),
        )));
    if let Some(monitor) = profile.monitor.build(transport) {
        bucket = bucket.with_monitor(monitor);
    }
    tracing::debug!("Connected profile '{}' to {}", profile.name, bucket.identity());
    Ok(bucket)
}
