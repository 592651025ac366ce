//! Transient reconciliation state
//!
//! None of these types is persisted. They describe what the reconciler is
//! doing right now and what it found on the remote side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;
use super::session::TrainingSession;

/// Status of the sync reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Success,
    Error,
}

impl SyncStatus {
    /// Returns true for the states that revert to idle after a display period
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Success | SyncStatus::Error)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Error => write!(f, "error"),
        }
    }
}

/// Status together with the last error message, as published to observers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    pub fn new(status: SyncStatus, error: Option<String>) -> Self {
        Self { status, error }
    }
}

/// Metadata of the remote backup file, fetched fresh on every attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileMetadata {
    pub id: RemoteId,
    pub modified_at: DateTime<Utc>,
}

impl RemoteFileMetadata {
    pub fn new(id: RemoteId, modified_at: DateTime<Utc>) -> Self {
        Self { id, modified_at }
    }

    /// Returns true if the remote file changed after the given watermark
    pub fn changed_since(&self, watermark: DateTime<Utc>) -> bool {
        self.modified_at > watermark
    }
}

/// Remote changes awaiting a user decision
///
/// Exists only between conflict detection and one of the two resolutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    /// File that was inspected; `keep_local` overwrites exactly this one
    pub remote_file_id: RemoteId,
    pub remote_modified_at: DateTime<Utc>,
    /// Decoded remote record set
    pub remote_records: Vec<TrainingSession>,
}
