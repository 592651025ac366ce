//! PawSync Sync - backup reconciliation engine
//!
//! This crate keeps the local training-session list and its single CSV
//! backup on Google Drive in step. It is built from two parts:
//!
//! - [`credentials::CredentialLifecycle`] decides whether a usable access
//!   token exists, renewing it silently when possible.
//! - [`reconciler::SyncReconciler`] runs one sync attempt at a time,
//!   publishes its status and holds a pending conflict until the caller
//!   resolves it.
//!
//! Both only talk to the outside world through the ports defined in
//! `pawsync-core`, so any combination of adapters (or test fakes) can be
//! plugged in.

pub mod credentials;
pub mod reconciler;

pub use credentials::CredentialLifecycle;
pub use reconciler::{ReconcilerSettings, SyncReconciler};

use pawsync_core::exchange::ExchangeError;
use pawsync_core::ports::{ConsentError, RemoteError};
use thiserror::Error;

/// Errors that can occur during a sync operation
#[derive(Debug, Error)]
pub enum SyncError {
    /// No credential is stored
    #[error("Not connected to Google Drive.")]
    NotConnected,

    /// The credential expired and could not be renewed; it has been cleared
    #[error("Session expired. Please reconnect Google Drive.")]
    SessionExpired,

    #[error(transparent)]
    Consent(#[from] ConsentError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Backup content could not be processed: {0}")]
    Exchange(#[from] ExchangeError),

    /// Local persistence failed
    #[error("Local storage error: {0:#}")]
    Store(#[from] anyhow::Error),

    /// `keep_local` needs the folder found by a previous sync
    #[error("No Google Drive folder is known yet. Run a sync first.")]
    NoFolderCached,
}

impl SyncError {
    /// Returns true if the remote rejected the access token (HTTP 401)
    pub fn is_credential_rejected(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_credential_rejected())
    }
}

/// Result of a reconciler operation
///
/// Failures are reported here as well as through the published status;
/// operations never return `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No backup existed; a new file was created
    Created,
    /// The existing backup was overwritten with local data
    Overwritten,
    /// The backup changed since the last sync and awaits a decision
    ConflictDetected { remote_count: usize },
    /// Local data was replaced by the backup content
    AcceptedRemote { record_count: usize },
    /// The operation failed with the given message
    Failed(String),
    /// Another operation was still running; nothing was done
    AlreadyInProgress,
    /// A resolution was requested without a pending conflict
    NothingToResolve,
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOutcome::Created => write!(f, "Backup created"),
            SyncOutcome::Overwritten => write!(f, "Backup updated"),
            SyncOutcome::ConflictDetected { remote_count } => write!(
                f,
                "Backup changed on another device ({remote_count} remote sessions)"
            ),
            SyncOutcome::AcceptedRemote { record_count } => {
                write!(f, "Replaced local data with {record_count} remote sessions")
            }
            SyncOutcome::Failed(message) => write!(f, "Sync failed: {message}"),
            SyncOutcome::AlreadyInProgress => write!(f, "A sync is already in progress"),
            SyncOutcome::NothingToResolve => write!(f, "No conflict to resolve"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(
            SyncError::NotConnected.to_string(),
            "Not connected to Google Drive."
        );
        assert_eq!(
            SyncError::SessionExpired.to_string(),
            "Session expired. Please reconnect Google Drive."
        );
    }

    #[test]
    fn test_remote_error_message_is_kept() {
        let err = SyncError::from(RemoteError::Status {
            operation: "File search".into(),
            status: 500,
            body: "backend error".into(),
        });
        assert_eq!(err.to_string(), "File search failed (500): backend error");
        assert!(!err.is_credential_rejected());
    }

    #[test]
    fn test_credential_rejection() {
        let err = SyncError::from(RemoteError::Status {
            operation: "File search".into(),
            status: 401,
            body: String::new(),
        });
        assert!(err.is_credential_rejected());
        assert!(!SyncError::NotConnected.is_credential_rejected());
    }
}
