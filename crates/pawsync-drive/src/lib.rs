//! PawSync Drive - Google Drive v3 adapter
//!
//! Provides async clients for:
//! - OAuth2 authorization (Authorization Code with PKCE, loopback redirect)
//! - Folder and file lookup in Google Drive
//! - Multipart upload and media download of the backup file
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 PKCE consent flow, renewal and revocation
//! - [`client`] - Authenticated HTTP client for the Drive API
//! - [`directory`] - Folder/file search and folder creation
//! - [`transfer`] - Multipart upload and `alt=media` download
//! - [`provider`] - Implementation of the core remote ports

pub mod auth;
pub mod client;
pub mod directory;
pub mod provider;
pub mod transfer;

use pawsync_core::ports::RemoteError;
use thiserror::Error;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// The API answered with a non-success status
    #[error("{operation} failed ({status}): {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// A network-level error occurred
    #[error("{operation} failed: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The API response could not be parsed or was malformed
    #[error("Invalid response from {operation}: {message}")]
    InvalidResponse {
        operation: &'static str,
        message: String,
    },
}

impl DriveError {
    pub(crate) fn network(operation: &'static str, source: reqwest::Error) -> Self {
        DriveError::Network { operation, source }
    }

    pub(crate) fn invalid(operation: &'static str, message: impl Into<String>) -> Self {
        DriveError::InvalidResponse {
            operation,
            message: message.into(),
        }
    }
}

impl From<DriveError> for RemoteError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Status {
                operation,
                status,
                body,
            } => RemoteError::Status {
                operation: operation.to_string(),
                status,
                body,
            },
            DriveError::Network { operation, source } => RemoteError::Transport {
                operation: operation.to_string(),
                message: source.to_string(),
            },
            DriveError::InvalidResponse { operation, message } => RemoteError::InvalidResponse {
                operation: operation.to_string(),
                message,
            },
        }
    }
}
