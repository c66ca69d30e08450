//! Bucket handle
//!
//! [`Bucket`] ties a [`BucketIdentity`] to the collaborators needed to work
//! with it: the transport, an optional synchronization monitor, the upload
//! history, and the strategy deciding whether an upload is needed. Each
//! handle owns its history, so throttling applies per handle.

use std::path::Path;
use std::sync::Arc;

use crate::error::{BucketOperation, Error, Result, evaluate_status};
use crate::history::UploadHistory;
use crate::identity::BucketIdentity;
use crate::interrupt::Interrupt;
use crate::listing::ListingResolver;
use crate::necessity::{UploadAlways, UploadNecessityCheck};
use crate::path::extend_path_to_filename;
use crate::token::StateToken;
use crate::traits::{SyncMonitor, Transport, TransportRequest};
use crate::upload::{ContentSource, SyncPolicy, UploadCoordinator, UploadResult};

/// Handle for one bucket
pub struct Bucket {
    identity: BucketIdentity,
    transport: Arc<dyn Transport>,
    listing: ListingResolver,
    coordinator: UploadCoordinator,
    history: UploadHistory,
    upload_check: Arc<dyn UploadNecessityCheck>,
}

impl Bucket {
    /// Create a handle without monitor, with the default sync policy
    pub fn new(identity: BucketIdentity, transport: Arc<dyn Transport>) -> Self {
        Self {
            identity,
            listing: ListingResolver::new(transport.clone()),
            coordinator: UploadCoordinator::new(transport.clone()),
            transport,
            history: UploadHistory::new(),
            upload_check: Arc::new(UploadAlways),
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn SyncMonitor>) -> Self {
        self.coordinator = self.coordinator.with_monitor(monitor);
        self
    }

    pub fn with_sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.coordinator = self.coordinator.with_policy(policy);
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.coordinator = self.coordinator.with_interrupt(interrupt);
        self
    }

    pub fn with_upload_check(mut self, check: Arc<dyn UploadNecessityCheck>) -> Self {
        self.upload_check = check;
        self
    }

    pub fn identity(&self) -> &BucketIdentity {
        &self.identity
    }

    pub fn history(&self) -> &UploadHistory {
        &self.history
    }

    pub fn listing(&self) -> &ListingResolver {
        &self.listing
    }

    pub fn has_monitor(&self) -> bool {
        self.coordinator.monitor().is_some()
    }

    /// Entries directly below `path`; directories end with a separator
    pub async fn list_contents(&self, path: &str) -> Result<Vec<String>> {
        self.listing.list(&self.identity, path, false).await
    }

    /// All object paths below `path`, relative to it
    pub async fn list_contents_recursively(&self, path: &str) -> Result<Vec<String>> {
        self.listing.list(&self.identity, path, true).await
    }

    /// Buckets of the service hosting this bucket
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        self.listing.list_buckets(&self.identity).await
    }

    pub async fn download_as_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let uri = self.identity.object_uri(path)?;
        tracing::info!("Downloading \"{uri}\"");
        let response = self
            .transport
            .send(TransportRequest::get(
                uri.clone(),
                &self.identity.read_credentials(),
            ))
            .await?;
        evaluate_status(uri.as_str(), BucketOperation::Download, response.status)?;
        Ok(response.body)
    }

    pub async fn download_as_string(&self, path: &str) -> Result<String> {
        let bytes = self.download_as_bytes(path).await?;
        String::from_utf8(bytes)
            .map_err(|e| Error::General(format!("Object \"{path}\" is not valid UTF-8: {e}")))
    }

    /// Download `path` into the local file `local`, replacing it
    pub async fn download_file(&self, path: &str, local: &Path) -> Result<()> {
        let bytes = self.download_as_bytes(path).await?;
        tokio::fs::write(local, bytes).await?;
        Ok(())
    }

    /// Upload a local file and wait until it is synchronized
    ///
    /// A destination ending with a separator gets the local file name
    /// appended. Returns the path the object was stored under.
    pub async fn upload_file(&self, local: &Path, path: &str) -> Result<String> {
        self.upload_local(local, path, true).await
    }

    /// Upload a local file without waiting for synchronization
    pub async fn upload_file_non_blocking(&self, local: &Path, path: &str) -> Result<String> {
        self.upload_local(local, path, false).await
    }

    /// Upload a local file unless the configured check says it is up to date
    pub async fn upload_file_if_necessary(&self, local: &Path, path: &str) -> Result<UploadResult> {
        let target = extend_path_to_filename(local, path);
        let necessary = self
            .upload_check
            .is_upload_necessary(local, &target, &self.identity)
            .await?;
        if necessary {
            self.upload_local(local, &target, true).await?;
        } else {
            tracing::info!(
                "Skipping upload of \"{}\" to \"{target}\": object is up to date",
                local.display()
            );
        }
        Ok(UploadResult {
            was_upload_necessary: necessary,
        })
    }

    pub async fn upload_string(&self, content: &str, path: &str) -> Result<()> {
        self.upload(ContentSource::Text(content.to_string()), path, true)
            .await
    }

    pub async fn upload_string_non_blocking(&self, content: &str, path: &str) -> Result<()> {
        self.upload(ContentSource::Text(content.to_string()), path, false)
            .await
    }

    pub async fn upload_bytes(&self, content: Vec<u8>, path: &str, blocking: bool) -> Result<()> {
        self.upload(ContentSource::Bytes(content), path, blocking)
            .await
    }

    async fn upload_local(&self, local: &Path, path: &str, blocking: bool) -> Result<String> {
        let target = extend_path_to_filename(local, path);
        self.upload(ContentSource::File(local.to_path_buf()), &target, blocking)
            .await?;
        Ok(target)
    }

    async fn upload(&self, content: ContentSource, path: &str, blocking: bool) -> Result<()> {
        self.coordinator
            .upload(&self.identity, &self.history, &content, path, blocking)
            .await
    }

    /// Delete an object
    ///
    /// The upload history keeps its entry, so uploading to the same path
    /// afterwards is still throttled.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.coordinator.delete(&self.identity, path).await
    }

    /// Ask the monitor whether `path` was synchronized at or after `token`
    pub async fn is_object_synchronized(&self, path: &str, token: &StateToken) -> Result<bool> {
        let monitor = self.coordinator.monitor().ok_or_else(|| {
            Error::MissingCapability(format!(
                "bucket \"{}\" has no synchronization monitor",
                self.identity.fully_qualified_name()
            ))
        })?;
        monitor.is_synchronized(&self.identity, path, token).await
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("identity", &self.identity)
            .field("has_monitor", &self.has_monitor())
            .field("policy", &self.coordinator.policy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Method, MockSyncMonitor, TransportResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers GET with `body`, everything else with 200
    struct StoreTransport {
        get_status: u16,
        body: Vec<u8>,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl StoreTransport {
        fn new(get_status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                get_status,
                body: body.as_bytes().to_vec(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<TransportRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for StoreTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
            let response = match request.method {
                Method::Get => TransportResponse::new(self.get_status, self.body.clone()),
                _ => TransportResponse::new(200, ""),
            };
            self.requests.lock().unwrap().push(request);
            Ok(response)
        }
    }

    struct NeverNecessary;

    #[async_trait]
    impl UploadNecessityCheck for NeverNecessary {
        async fn is_upload_necessary(
            &self,
            _local: &Path,
            _path: &str,
            _bucket: &BucketIdentity,
        ) -> Result<bool> {
            Ok(false)
        }
    }

    fn identity() -> BucketIdentity {
        BucketIdentity::new("localhost", 2580, "default")
            .with_read_password("r")
            .with_write_password("w")
    }

    fn synchronized_monitor() -> Arc<MockSyncMonitor> {
        let mut monitor = MockSyncMonitor::new();
        monitor.expect_is_synchronized().returning(|_, _, _| Ok(true));
        monitor
            .expect_resolution()
            .return_const(Duration::from_secs(1));
        Arc::new(monitor)
    }

    #[tokio::test]
    async fn test_list_contents() {
        let bucket = Bucket::new(identity(), StoreTransport::new(200, "a.txt dir/b.txt"));
        assert_eq!(bucket.list_contents("").await.unwrap(), ["a.txt", "dir/"]);
        assert_eq!(
            bucket.list_contents_recursively("").await.unwrap(),
            ["a.txt", "dir/b.txt"]
        );
    }

    #[tokio::test]
    async fn test_download() {
        let transport = StoreTransport::new(200, "content");
        let bucket = Bucket::new(identity(), transport.clone());
        assert_eq!(bucket.download_as_string("/a.txt").await.unwrap(), "content");
        assert_eq!(
            transport.requests()[0].uri.as_str(),
            "http://localhost:2580/default/a.txt"
        );

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.txt");
        bucket.download_file("a.txt", &local).await.unwrap();
        assert_eq!(std::fs::read_to_string(local).unwrap(), "content");
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let bucket = Bucket::new(identity(), StoreTransport::new(404, ""));
        assert!(matches!(
            bucket.download_as_bytes("a.txt").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_file_to_directory_appends_name() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("udf.jar");
        std::fs::write(&local, "jar").unwrap();

        let transport = StoreTransport::new(200, "");
        let bucket = Bucket::new(identity(), transport.clone()).with_monitor(synchronized_monitor());
        let stored = bucket.upload_file(&local, "jars/").await.unwrap();

        assert_eq!(stored, "jars/udf.jar");
        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Put);
        assert_eq!(
            requests[0].uri.as_str(),
            "http://localhost:2580/default/jars/udf.jar"
        );
        assert!(bucket.history().last_upload("jars/udf.jar").await.is_some());
    }

    #[tokio::test]
    async fn test_blocking_upload_requires_monitor() {
        let bucket = Bucket::new(identity(), StoreTransport::new(200, ""));
        assert!(matches!(
            bucket.upload_string("x", "a.txt").await,
            Err(Error::MissingCapability(_))
        ));
        bucket.upload_string_non_blocking("x", "a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_without_write_password() {
        let read_only = BucketIdentity::new("localhost", 2580, "default");
        let bucket = Bucket::new(read_only, StoreTransport::new(200, ""));
        assert!(matches!(
            bucket.upload_bytes(vec![1], "a.bin", false).await,
            Err(Error::MissingCapability(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_if_necessary_skips() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.txt");
        std::fs::write(&local, "x").unwrap();

        let transport = StoreTransport::new(200, "");
        let bucket = Bucket::new(identity(), transport.clone())
            .with_upload_check(Arc::new(NeverNecessary));
        let result = bucket.upload_file_if_necessary(&local, "dir/").await.unwrap();
        assert!(!result.was_upload_necessary);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upload_if_necessary_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.txt");
        std::fs::write(&local, "x").unwrap();

        let transport = StoreTransport::new(200, "");
        let bucket = Bucket::new(identity(), transport.clone()).with_monitor(synchronized_monitor());
        let result = bucket.upload_file_if_necessary(&local, "dir/").await.unwrap();
        assert!(result.was_upload_necessary);
        assert_eq!(
            transport.requests()[0].uri.as_str(),
            "http://localhost:2580/default/dir/a.txt"
        );
    }

    #[tokio::test]
    async fn test_delete_keeps_history() {
        let transport = StoreTransport::new(200, "");
        let bucket = Bucket::new(identity(), transport.clone());
        bucket.upload_string_non_blocking("x", "a.txt").await.unwrap();
        bucket.delete("a.txt").await.unwrap();

        assert_eq!(transport.requests()[1].method, Method::Delete);
        assert!(bucket.history().last_upload("a.txt").await.is_some());
    }

    #[tokio::test]
    async fn test_is_object_synchronized() {
        let token = StateToken::now(Duration::from_secs(1));
        let bucket = Bucket::new(identity(), StoreTransport::new(200, ""));
        assert!(matches!(
            bucket.is_object_synchronized("a.txt", &token).await,
            Err(Error::MissingCapability(_))
        ));

        let bucket = bucket.with_monitor(synchronized_monitor());
        assert!(bucket.is_object_synchronized("a.txt", &token).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_buckets() {
        let transport = StoreTransport::new(200, "default other");
        let bucket = Bucket::new(identity(), transport.clone());
        assert_eq!(bucket.list_buckets().await.unwrap(), ["default", "other"]);
    }
}
