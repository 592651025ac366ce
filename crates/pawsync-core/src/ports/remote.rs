//! Remote storage ports (driven/secondary ports)
//!
//! Two small interfaces cover everything the reconciler needs from the
//! remote storage: a directory for folder/file lookup and a transfer port
//! for moving the content of a single file. The only implementation talks
//! to the Google Drive v3 API.
//!
//! ## Design Notes
//!
//! - Unlike most ports these return a typed [`RemoteError`], because the
//!   reconciler must recognise a rejected credential (HTTP 401).
//! - Every call receives the bearer token explicitly; adapters hold no
//!   credential state of their own.

use thiserror::Error;

use crate::domain::newtypes::{AccessToken, FolderId, RemoteId};
use crate::domain::RemoteFileMetadata;

/// HTTP status the remote returns for an expired or revoked token
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Failure of a remote storage call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote answered with a non-success status
    #[error("{operation} failed ({status}): {body}")]
    Status {
        /// Human-readable operation name, e.g. "Folder search"
        operation: String,
        status: u16,
        /// Response body text, empty when none was available
        body: String,
    },

    /// The request never produced a response
    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },

    /// The response could not be interpreted
    #[error("Invalid response from {operation}: {message}")]
    InvalidResponse { operation: String, message: String },
}

impl RemoteError {
    /// Returns true if the remote rejected the bearer token
    pub fn is_credential_rejected(&self) -> bool {
        matches!(self, RemoteError::Status { status, .. } if *status == STATUS_UNAUTHORIZED)
    }

    /// Status code of the response, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// IRemoteDirectory
// ============================================================================

/// Folder and file lookup on the remote storage
#[async_trait::async_trait]
pub trait IRemoteDirectory: Send + Sync {
    /// Returns the first non-trashed folder named `name`, creating it when
    /// none exists
    ///
    /// Lookup and create are separate requests, so two clients running
    /// their first sync at the same time can create duplicate folders.
    async fn find_or_create_folder(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> Result<FolderId, RemoteError>;

    /// Looks up a non-trashed file with exactly this name inside `folder`
    async fn find_file(
        &self,
        token: &AccessToken,
        folder: &FolderId,
        name: &str,
    ) -> Result<Option<RemoteFileMetadata>, RemoteError>;
}

// ============================================================================
// IRemoteTransfer
// ============================================================================

/// Content transfer for a single remote file
#[async_trait::async_trait]
pub trait IRemoteTransfer: Send + Sync {
    /// Uploads `content` as `name`
    ///
    /// With `file_id` the existing file is overwritten in place; without it
    /// a new file is created inside `folder`. Returns the file's id.
    async fn upload(
        &self,
        token: &AccessToken,
        folder: &FolderId,
        file_id: Option<&RemoteId>,
        name: &str,
        content: &str,
    ) -> Result<RemoteId, RemoteError>;

    /// Downloads the full content of a file as text
    async fn download(&self, token: &AccessToken, file_id: &RemoteId)
        -> Result<String, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = RemoteError::Status {
            operation: "File search".into(),
            status: 403,
            body: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "File search failed (403): forbidden");
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_credential_rejected());
    }

    #[test]
    fn test_unauthorized_is_credential_rejected() {
        let err = RemoteError::Status {
            operation: "File search".into(),
            status: 401,
            body: String::new(),
        };
        assert!(err.is_credential_rejected());
    }

    #[test]
    fn test_transport_error_is_not_credential_rejected() {
        let err = RemoteError::Transport {
            operation: "File download".into(),
            message: "connection reset".into(),
        };
        assert!(!err.is_credential_rejected());
        assert_eq!(err.status(), None);
    }
}
