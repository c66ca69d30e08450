//! Upload history of a bucket handle
//!
//! Records when each path was last uploaded so that a repeated upload to the
//! same path can be delayed until the synchronization monitor is able to tell
//! the two uploads apart. Entries are never pruned while the owning handle
//! lives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use jiff::Timestamp;

use crate::path::remove_leading_separator;

/// Per-path slot holding the instant of the last upload
///
/// The coordinator keeps the slot locked from the throttle check until the
/// upload is recorded, so two concurrent uploads to the same path cannot both
/// observe "no prior upload".
pub type HistorySlot = Arc<tokio::sync::Mutex<Option<Timestamp>>>;

/// Mapping from normalized path in bucket to the instant of its last upload
#[derive(Debug, Default)]
pub struct UploadHistory {
    slots: Mutex<HashMap<String, HistorySlot>>,
}

impl UploadHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized key under which `path` is recorded
    pub fn normalize(path: &str) -> &str {
        remove_leading_separator(path)
    }

    /// Get or create the slot for `path`
    pub fn slot(&self, path: &str) -> HistorySlot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(Self::normalize(path).to_string())
            .or_default()
            .clone()
    }

    /// Instant of the last recorded upload to `path`
    pub async fn last_upload(&self, path: &str) -> Option<Timestamp> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(Self::normalize(path)).cloned()
        }?;
        let last = *slot.lock().await;
        last
    }

    /// Record an upload to `path` at `at`
    pub async fn record(&self, path: &str, at: Timestamp) {
        let slot = self.slot(path);
        *slot.lock().await = Some(at);
        tracing::debug!("Recorded upload to \"{path}\" at {at} in upload history");
    }
}
