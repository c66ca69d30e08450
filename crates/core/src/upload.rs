//! Upload coordination
//!
//! An upload to BucketFS is accepted immediately but only becomes visible
//! once the store has synchronized it. [`UploadCoordinator`] throttles
//! repeated uploads to the same path, issues the PUT, and for blocking
//! uploads polls the [`SyncMonitor`] until it reports success, the wait
//! times out, or the caller interrupts it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{BucketOperation, Error, Result};
use crate::history::UploadHistory;
use crate::identity::BucketIdentity;
use crate::interrupt::Interrupt;
use crate::token::{StateToken, elapsed_between, truncate};
use crate::traits::{SyncMonitor, Transport, TransportRequest};

/// Default upper bound of the synchronization wait
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Default delay between two monitor queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

const EXCERPT_LENGTH: usize = 20;

/// Bounds of the synchronization wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPolicy {
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Content to upload
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// A local file, read completely before any request is made
    File(PathBuf),
    Text(String),
    Bytes(Vec<u8>),
}

impl ContentSource {
    /// Short description used in log messages
    pub fn description(&self) -> String {
        match self {
            ContentSource::File(path) => format!("file {}", path.display()),
            ContentSource::Text(text) => {
                if text.chars().count() > EXCERPT_LENGTH {
                    let excerpt: String = text.chars().take(EXCERPT_LENGTH).collect();
                    format!("text {excerpt}...")
                } else {
                    format!("text {text}")
                }
            }
            ContentSource::Bytes(bytes) => format!("{} bytes", bytes.len()),
        }
    }

    /// Read the whole content
    pub async fn read(&self) -> Result<Vec<u8>> {
        match self {
            ContentSource::File(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| Error::ContentUnavailable {
                        description: format!(
                            "I/O failed to open file \"{}\" for upload",
                            path.display()
                        ),
                        source,
                    })
            }
            ContentSource::Text(text) => Ok(text.clone().into_bytes()),
            ContentSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Outcome of a conditional upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// `false` if the upload was skipped because the object was up to date
    pub was_upload_necessary: bool,
}

/// Orchestrates throttle, PUT and synchronization wait of uploads
#[derive(Clone)]
pub struct UploadCoordinator {
    transport: Arc<dyn Transport>,
    monitor: Option<Arc<dyn SyncMonitor>>,
    policy: SyncPolicy,
    interrupt: Interrupt,
}

impl UploadCoordinator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            monitor: None,
            policy: SyncPolicy::default(),
            interrupt: Interrupt::never(),
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn SyncMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn monitor(&self) -> Option<&Arc<dyn SyncMonitor>> {
        self.monitor.as_ref()
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    fn require_monitor(&self, bucket: &BucketIdentity) -> Result<&Arc<dyn SyncMonitor>> {
        self.monitor.as_ref().ok_or_else(|| {
            Error::MissingCapability(format!(
                "bucket \"{}\" has no synchronization monitor",
                bucket.fully_qualified_name()
            ))
        })
    }

    /// Upload `content` to `path` in `bucket`
    ///
    /// A blocking upload returns once the monitor confirms the object is
    /// synchronized. A non-blocking upload returns as soon as the store has
    /// accepted the content.
    pub async fn upload(
        &self,
        bucket: &BucketIdentity,
        history: &UploadHistory,
        content: &ContentSource,
        path: &str,
        blocking: bool,
    ) -> Result<()> {
        let credentials = bucket.write_credentials().ok_or_else(|| {
            Error::MissingCapability(format!(
                "bucket \"{}\" has no write credentials",
                bucket.fully_qualified_name()
            ))
        })?;
        let monitor = if blocking {
            Some(self.require_monitor(bucket)?)
        } else {
            None
        };

        let path = UploadHistory::normalize(path);
        let body = content.read().await?;
        let uri = bucket.object_uri(path)?;

        // Held until the upload is recorded or has failed.
        let slot = history.slot(path);
        let mut last_upload = slot.lock().await;

        if let Some(monitor) = monitor {
            self.delay_repeated_upload(path, *last_upload, monitor.resolution())
                .await?;
        }

        let started = Timestamp::now();
        tracing::info!(
            "Uploading \"{}\" to bucket \"{}\" at \"{uri}\"",
            content.description(),
            bucket.fully_qualified_name()
        );
        let response = self
            .transport
            .send(TransportRequest::put(uri.clone(), &credentials, body))
            .await?;
        if !response.is_success() {
            tracing::error!(
                "{}: Failed to upload \"{}\" to \"{uri}\"",
                response.status,
                content.description()
            );
            return Err(Error::UploadFailed {
                status: response.status,
                target: uri.to_string(),
            });
        }
        tracing::debug!("Successfully uploaded to \"{uri}\"");

        if let Some(monitor) = monitor {
            let token = StateToken::at(started, monitor.resolution());
            self.wait_until_synchronized(monitor.as_ref(), bucket, path, &token)
                .await?;
        }

        let now = Timestamp::now();
        *last_upload = Some(now);
        tracing::debug!("Recorded upload to \"{path}\" at {now} in upload history");
        Ok(())
    }

    /// Delay a repeated upload until the monitor can tell it from the last one
    async fn delay_repeated_upload(
        &self,
        path: &str,
        last_upload: Option<Timestamp>,
        resolution: Duration,
    ) -> Result<()> {
        let Some(last_upload) = last_upload else {
            tracing::debug!(
                "No previous uploads to \"{path}\" recorded in upload history. No upload delay required."
            );
            return Ok(());
        };

        let elapsed = elapsed_between(truncate(last_upload, resolution), Timestamp::now());
        if elapsed < resolution {
            let delay = resolution - elapsed;
            tracing::debug!("Delaying upload to \"{path}\" for {} ms", delay.as_millis());
            self.interrupt
                .sleep(delay, &format!("delaying upload to \"{path}\""))
                .await?;
        }
        Ok(())
    }

    /// Poll `monitor` until it accepts `token` for `path`
    ///
    /// Ends in exactly one of: synchronized (`Ok`), [`Error::Timeout`] once
    /// the policy's maximum wait has passed, or [`Error::Interrupted`].
    pub async fn wait_until_synchronized(
        &self,
        monitor: &dyn SyncMonitor,
        bucket: &BucketIdentity,
        path: &str,
        token: &StateToken,
    ) -> Result<()> {
        let expiry = tokio::time::Instant::now() + self.policy.max_wait;
        let context = format!(
            "waiting for \"{path}\" to be synchronized in bucket \"{}\"",
            bucket.fully_qualified_name()
        );
        loop {
            self.interrupt.check(&context)?;
            if monitor.is_synchronized(bucket, path, token).await? {
                tracing::debug!("Object \"{path}\" synchronized after {token}");
                return Ok(());
            }

            let now = tokio::time::Instant::now();
            if now >= expiry {
                let err = Error::Timeout {
                    path: path.to_string(),
                    bucket: bucket.fully_qualified_name(),
                    after: token.time().to_string(),
                };
                tracing::error!("{err}");
                return Err(err);
            }
            let pause = self.policy.poll_interval.min(expiry - now);
            self.interrupt.sleep(pause, &context).await?;
        }
    }

    /// Delete `path` from `bucket`
    pub async fn delete(&self, bucket: &BucketIdentity, path: &str) -> Result<()> {
        let credentials = bucket.write_credentials().ok_or_else(|| {
            Error::MissingCapability(format!(
                "bucket \"{}\" has no write credentials",
                bucket.fully_qualified_name()
            ))
        })?;
        let uri = bucket.object_uri(path)?;
        tracing::info!("Deleting \"{uri}\"");
        let response = self
            .transport
            .send(TransportRequest::delete(uri.clone(), &credentials))
            .await?;
        crate::error::evaluate_status(uri.as_str(), BucketOperation::Delete, response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Method, MockSyncMonitor, TransportResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[derive(Default)]
    struct RecordingTransport {
        status: u16,
        requests: Mutex<Vec<(TransportRequest, Instant)>>,
        sent_at: Mutex<Vec<Timestamp>>,
    }

    impl RecordingTransport {
        fn with_status(status: u16) -> Arc<Self> {
            Arc::new(Self {
                status,
                requests: Mutex::new(Vec::new()),
                sent_at: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((request, Instant::now()));
            self.sent_at.lock().unwrap().push(Timestamp::now());
            Ok(TransportResponse::new(self.status, ""))
        }
    }

    /// Reports synchronized after a given number of queries
    struct CountingMonitor {
        ready_after: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SyncMonitor for CountingMonitor {
        async fn is_synchronized(
            &self,
            _bucket: &BucketIdentity,
            _path: &str,
            _token: &StateToken,
        ) -> Result<bool> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.ready_after)
        }
    }

    fn bucket() -> BucketIdentity {
        BucketIdentity::new("localhost", 2580, "default")
            .with_read_password("r")
            .with_write_password("w")
    }

    fn fast_policy() -> SyncPolicy {
        SyncPolicy {
            max_wait: Duration::from_millis(300),
            poll_interval: Duration::from_millis(20),
        }
    }

    fn always(result: bool) -> Arc<MockSyncMonitor> {
        let mut monitor = MockSyncMonitor::new();
        monitor
            .expect_is_synchronized()
            .returning(move |_, _, _| Ok(result));
        monitor
            .expect_resolution()
            .return_const(Duration::from_secs(1));
        Arc::new(monitor)
    }

    #[test]
    fn test_content_description() {
        assert_eq!(ContentSource::Text("short".into()).description(), "text short");
        assert_eq!(
            ContentSource::Text("a".repeat(25)).description(),
            format!("text {}...", "a".repeat(20))
        );
        assert_eq!(ContentSource::Bytes(vec![1, 2]).description(), "2 bytes");
    }

    #[tokio::test]
    async fn test_missing_file_makes_no_request() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone());
        let history = UploadHistory::new();

        let content = ContentSource::File(PathBuf::from("/nonexistent/file.txt"));
        let err = coordinator
            .upload(&bucket(), &history, &content, "file.txt", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContentUnavailable { .. }));
        assert_eq!(transport.count(), 0);
    }

    #[tokio::test]
    async fn test_non_blocking_upload_records_history() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone());
        let history = UploadHistory::new();

        coordinator
            .upload(
                &bucket(),
                &history,
                &ContentSource::Text("hello".into()),
                "/dir/a.txt",
                false,
            )
            .await
            .unwrap();

        assert!(history.last_upload("dir/a.txt").await.is_some());
        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0.method, Method::Put);
        assert_eq!(
            requests[0].0.uri.as_str(),
            "http://localhost:2580/default/dir/a.txt"
        );
        assert_eq!(requests[0].0.body.as_deref(), Some(&b"hello"[..]));
        assert_eq!(
            requests[0].0.authorization.as_deref(),
            Some("Basic dzp3")
        );
    }

    #[tokio::test]
    async fn test_non_blocking_upload_skips_monitor() {
        let transport = RecordingTransport::with_status(200);
        let mut monitor = MockSyncMonitor::new();
        monitor.expect_is_synchronized().never();
        monitor.expect_resolution().never();
        let coordinator = UploadCoordinator::new(transport).with_monitor(Arc::new(monitor));

        coordinator
            .upload(
                &bucket(),
                &UploadHistory::new(),
                &ContentSource::Text("x".into()),
                "a.txt",
                false,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_failed_status() {
        let transport = RecordingTransport::with_status(500);
        let coordinator = UploadCoordinator::new(transport);
        let history = UploadHistory::new();

        let err = coordinator
            .upload(
                &bucket(),
                &history,
                &ContentSource::Text("x".into()),
                "a.txt",
                false,
            )
            .await
            .unwrap_err();
        match err {
            Error::UploadFailed { status, target } => {
                assert_eq!(status, 500);
                assert_eq!(target, "http://localhost:2580/default/a.txt");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(history.last_upload("a.txt").await.is_none());
    }

    #[tokio::test]
    async fn test_upload_without_write_credentials() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone());
        let read_only = BucketIdentity::new("localhost", 2580, "default");

        let err = coordinator
            .upload(
                &read_only,
                &UploadHistory::new(),
                &ContentSource::Text("x".into()),
                "a.txt",
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCapability(_)));
        assert_eq!(transport.count(), 0);
    }

    #[tokio::test]
    async fn test_blocking_upload_without_monitor() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone());

        let err = coordinator
            .upload(
                &bucket(),
                &UploadHistory::new(),
                &ContentSource::Text("x".into()),
                "a.txt",
                true,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCapability(_)));
        assert_eq!(transport.count(), 0);
    }

    #[tokio::test]
    async fn test_blocking_upload_polls_until_synchronized() {
        let transport = RecordingTransport::with_status(200);
        let monitor = Arc::new(CountingMonitor {
            ready_after: 3,
            calls: AtomicUsize::new(0),
        });
        let coordinator = UploadCoordinator::new(transport)
            .with_monitor(monitor.clone())
            .with_policy(fast_policy());
        let history = UploadHistory::new();

        coordinator
            .upload(
                &bucket(),
                &history,
                &ContentSource::Text("x".into()),
                "a.txt",
                true,
            )
            .await
            .unwrap();

        assert_eq!(monitor.calls.load(Ordering::SeqCst), 3);
        assert!(history.last_upload("a.txt").await.is_some());
    }

    #[tokio::test]
    async fn test_monitor_receives_token_not_after_upload_start() {
        let transport = RecordingTransport::with_status(200);
        let mut monitor = MockSyncMonitor::new();
        monitor
            .expect_is_synchronized()
            .withf(move |_, path, token| path == "dir/a.txt" && token.time() <= Timestamp::now())
            .returning(move |_, _, token| Ok(token.accepts_instant(Timestamp::now())));
        monitor
            .expect_resolution()
            .return_const(Duration::from_secs(1));
        let coordinator = UploadCoordinator::new(transport)
            .with_monitor(Arc::new(monitor))
            .with_policy(fast_policy());

        coordinator
            .upload(
                &bucket(),
                &UploadHistory::new(),
                &ContentSource::Text("x".into()),
                "/dir/a.txt",
                true,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_timeout_is_not_recorded() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport)
            .with_monitor(always(false))
            .with_policy(fast_policy());
        let history = UploadHistory::new();

        let started = Instant::now();
        let err = coordinator
            .upload(
                &bucket(),
                &history,
                &ContentSource::Text("x".into()),
                "a.txt",
                true,
            )
            .await
            .unwrap_err();

        let elapsed = started.elapsed();
        assert!(matches!(err, Error::Timeout { ref path, ref bucket, .. }
            if path == "a.txt" && bucket == "bfsdefault/default"));
        assert!(elapsed >= Duration::from_millis(300));
        assert!(history.last_upload("a.txt").await.is_none());
    }

    #[tokio::test]
    async fn test_wait_times_out_within_one_poll_interval() {
        let coordinator = UploadCoordinator::new(RecordingTransport::with_status(200))
            .with_policy(SyncPolicy {
                max_wait: Duration::from_millis(250),
                poll_interval: Duration::from_millis(100),
            });
        let monitor = always(false);
        let token = StateToken::now(Duration::from_secs(1));

        let started = Instant::now();
        let err = coordinator
            .wait_until_synchronized(monitor.as_ref(), &bucket(), "a.txt", &token)
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, Error::Timeout { .. }));
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_millis(250 + 100 + 200));
    }

    #[tokio::test]
    async fn test_wait_is_interruptible() {
        let (handle, interrupt) = Interrupt::channel();
        let coordinator = UploadCoordinator::new(RecordingTransport::with_status(200))
            .with_policy(SyncPolicy {
                max_wait: Duration::from_secs(30),
                poll_interval: Duration::from_millis(50),
            })
            .with_interrupt(interrupt);
        let monitor = always(false);
        let token = StateToken::now(Duration::from_secs(1));

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            handle.trigger();
            handle
        });

        let started = Instant::now();
        let err = coordinator
            .wait_until_synchronized(monitor.as_ref(), &bucket(), "a.txt", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Interrupted(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
        let _handle = trigger.await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_upload_is_throttled() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone())
            .with_monitor(always(true))
            .with_policy(fast_policy());
        let history = UploadHistory::new();
        let content = ContentSource::Text("x".into());

        coordinator
            .upload(&bucket(), &history, &content, "a.txt", true)
            .await
            .unwrap();
        let recorded = history.last_upload("a.txt").await.unwrap();
        coordinator
            .upload(&bucket(), &history, &content, "a.txt", true)
            .await
            .unwrap();

        // The second PUT must not start before the second following the
        // recorded upload.
        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let boundary = truncate(recorded, Duration::from_secs(1)).as_nanosecond()
            + Duration::from_secs(1).as_nanos() as i128;
        let gap = requests[1].1.duration_since(requests[0].1);
        let recorded_to_boundary = boundary - recorded.as_nanosecond();
        assert!(gap.as_nanos() as i128 >= recorded_to_boundary);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_to_same_path_are_serialized() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone())
            .with_monitor(always(true))
            .with_policy(fast_policy());
        let history = UploadHistory::new();
        let first = ContentSource::Text("first".into());
        let second = ContentSource::Text("second".into());

        let bucket_a = bucket();
        let bucket_b = bucket();
        let (a, b) = tokio::join!(
            coordinator.upload(&bucket_a, &history, &first, "a.txt", true),
            coordinator.upload(&bucket_b, &history, &second, "/a.txt", true),
        );
        a.unwrap();
        b.unwrap();

        // Whichever upload ran second must start in a later second than the
        // first PUT.
        let sent_at = transport.sent_at.lock().unwrap();
        assert_eq!(sent_at.len(), 2);
        let next_second = truncate(sent_at[0], Duration::from_secs(1))
            + jiff::SignedDuration::from_secs(1);
        assert!(
            sent_at[1] >= next_second,
            "second PUT at {} before {next_second}",
            sent_at[1]
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_relative_path() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone());
        let history = UploadHistory::new();

        let err = coordinator
            .upload(
                &bucket(),
                &history,
                &ContentSource::Text("x".into()),
                "../other/x.txt",
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
        assert_eq!(transport.count(), 0);
        assert!(history.last_upload("../other/x.txt").await.is_none());
    }

    #[tokio::test]
    async fn test_different_paths_are_not_throttled() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone())
            .with_monitor(always(true))
            .with_policy(fast_policy());
        let history = UploadHistory::new();
        let content = ContentSource::Text("x".into());

        let started = Instant::now();
        coordinator
            .upload(&bucket(), &history, &content, "a.txt", true)
            .await
            .unwrap();
        coordinator
            .upload(&bucket(), &history, &content, "b.txt", true)
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_throttle_delay_is_interruptible() {
        let (handle, interrupt) = Interrupt::channel();
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone())
            .with_monitor(always(true))
            .with_policy(fast_policy())
            .with_interrupt(interrupt);
        let history = UploadHistory::new();
        history
            .record("a.txt", Timestamp::now() + jiff::SignedDuration::from_secs(5))
            .await;

        handle.trigger();
        let err = coordinator
            .upload(
                &bucket(),
                &history,
                &ContentSource::Text("x".into()),
                "a.txt",
                true,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Interrupted(_)));
        assert_eq!(transport.count(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let transport = RecordingTransport::with_status(200);
        let coordinator = UploadCoordinator::new(transport.clone());
        coordinator.delete(&bucket(), "/dir/a.txt").await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0.method, Method::Delete);
        assert_eq!(
            requests[0].0.uri.as_str(),
            "http://localhost:2580/default/dir/a.txt"
        );
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let coordinator = UploadCoordinator::new(RecordingTransport::with_status(404));
        assert!(matches!(
            coordinator.delete(&bucket(), "a.txt").await,
            Err(Error::NotFound(_))
        ));
    }
}
