//! GoogleDriveProvider - remote port implementation for Google Drive
//!
//! Wraps the [`DriveClient`] and delegates to the directory and transfer
//! modules to fulfil the [`IRemoteDirectory`] and [`IRemoteTransfer`]
//! port contracts.
//!
//! ## Design Notes
//!
//! - `DriveClient` holds no mutable state, so no lock is needed here.
//! - Consent and renewal live in [`crate::auth::GoogleConsentAdapter`];
//!   this provider only moves files.

use pawsync_core::domain::{AccessToken, FolderId, RemoteFileMetadata, RemoteId};
use pawsync_core::ports::{IRemoteDirectory, IRemoteTransfer, RemoteError};

use crate::client::DriveClient;

/// Google Drive implementation of the remote storage ports
#[derive(Debug, Clone)]
pub struct GoogleDriveProvider {
    client: DriveClient,
}

impl GoogleDriveProvider {
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IRemoteDirectory for GoogleDriveProvider {
    async fn find_or_create_folder(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> Result<FolderId, RemoteError> {
        Ok(self.client.find_or_create_folder(token, name).await?)
    }

    async fn find_file(
        &self,
        token: &AccessToken,
        folder: &FolderId,
        name: &str,
    ) -> Result<Option<RemoteFileMetadata>, RemoteError> {
        Ok(self.client.find_file(token, folder, name).await?)
    }
}

#[async_trait::async_trait]
impl IRemoteTransfer for GoogleDriveProvider {
    async fn upload(
        &self,
        token: &AccessToken,
        folder: &FolderId,
        file_id: Option<&RemoteId>,
        name: &str,
        content: &str,
    ) -> Result<RemoteId, RemoteError> {
        Ok(self
            .client
            .upload_file(token, folder, file_id, name, content)
            .await?)
    }

    async fn download(
        &self,
        token: &AccessToken,
        file_id: &RemoteId,
    ) -> Result<String, RemoteError> {
        Ok(self.client.download_file(token, file_id).await?)
    }
}
