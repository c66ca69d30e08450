//! Status API based synchronization monitor

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Deserialize;
use url::Url;

use crate::error::{BucketOperation, Result, evaluate_status};
use crate::identity::{BucketIdentity, append_path};
use crate::token::{MICROSECOND_RESOLUTION, StateToken};
use crate::traits::{SyncMonitor, Transport, TransportRequest};

#[derive(Debug, Deserialize)]
struct ObjectStatus {
    synchronized_at: Timestamp,
}

/// Monitor querying `{endpoint}/{service}/{bucket}/{path}` for the instant
/// an object became available cluster-wide
///
/// The endpoint answers 404 while the object is not synchronized yet.
pub struct ApiStatusMonitor {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl ApiStatusMonitor {
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    fn status_uri(&self, bucket: &BucketIdentity, path: &str) -> Result<Url> {
        let mut base = Url::parse(&self.endpoint)?;
        if let Ok(mut segments) = base.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([bucket.service.as_str(), bucket.bucket.as_str()]);
        }
        append_path(base, path)
    }
}

#[async_trait]
impl SyncMonitor for ApiStatusMonitor {
    async fn is_synchronized(
        &self,
        bucket: &BucketIdentity,
        path: &str,
        token: &StateToken,
    ) -> Result<bool> {
        let uri = self.status_uri(bucket, path)?;
        let response = self
            .transport
            .send(TransportRequest::get(uri.clone(), &bucket.read_credentials()))
            .await?;
        if response.status == 404 {
            return Ok(false);
        }
        evaluate_status(uri.as_str(), BucketOperation::Download, response.status)?;

        let status: ObjectStatus = serde_json::from_slice(&response.body)?;
        tracing::debug!(
            "Object \"{path}\" synchronized at {}, waiting for {token}",
            status.synchronized_at
        );
        Ok(token.accepts_instant(status.synchronized_at))
    }

    fn resolution(&self) -> Duration {
        MICROSECOND_RESOLUTION
    }
}
