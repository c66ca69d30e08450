//! bfs-core: Core library for the bfs BucketFS client
//!
//! This crate provides the core functionality for the bfs CLI, including:
//! - Configuration and bucket profile management
//! - Bucket addressing, listing resolution and path parsing
//! - Upload coordination: throttling, synchronization wait and cancellation
//! - Synchronization monitors (daemon logs or status API)
//!
//! This crate is independent of any specific HTTP client. Requests go
//! through the [`Transport`] trait, which `bfs-http` implements.

pub mod bucket;
pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod interrupt;
pub mod listing;
pub mod monitor;
pub mod necessity;
pub mod path;
pub mod profile;
pub mod token;
pub mod traits;
pub mod upload;

pub use bucket::Bucket;
pub use config::{Config, ConfigManager, SyncDefaults};
pub use error::{BucketOperation, Error, Result, evaluate_status};
pub use history::UploadHistory;
pub use identity::{BucketIdentity, Credentials, Protocol};
pub use interrupt::{Interrupt, InterruptHandle};
pub use listing::{ListingResolver, resolve_listing};
pub use monitor::{ApiStatusMonitor, LogPatternMonitor, MonitorConfig};
pub use necessity::{
    ChecksumUploadCheck, DownloadChecksum, RemoteChecksum, UploadAlways, UploadNecessityCheck,
};
pub use path::{ParsedPath, RemotePath, parse_path, parse_remote_path};
pub use profile::{BucketProfile, ProfileManager};
pub use token::StateToken;
pub use traits::{Method, SyncMonitor, Transport, TransportRequest, TransportResponse};
pub use upload::{ContentSource, SyncPolicy, UploadCoordinator, UploadResult};
