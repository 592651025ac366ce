//! Sync reconciler
//!
//! The [`SyncReconciler`] compares the local record set with the single
//! backup file on Google Drive and decides, per attempt, whether to create
//! it, overwrite it, or stop and ask the caller what to do.
//!
//! ## Decision rule
//!
//! 1. **No backup file**: upload local records as a new file.
//! 2. **Backup not modified after the watermark**: overwrite it.
//! 3. **Backup modified after the watermark**: download and decode it,
//!    hold it as a [`ConflictRecord`] and leave local data alone. The caller
//!    then picks [`SyncReconciler::accept_remote`] or
//!    [`SyncReconciler::keep_local`].
//!
//! The watermark is the instant of the last successful write in either
//! direction. There are no automatic retries: every operation is exactly one
//! attempt, and its failure is published as the `error` status.
//!
//! ## Status
//!
//! Observers read a [`StatusSnapshot`] through a `watch` channel. `success`
//! and `error` fall back to `idle` after the configured display duration
//! unless another transition happened first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pawsync_core::config::Config;
use pawsync_core::domain::{
    AccessToken, ConflictRecord, Credential, FolderId, RemoteFileMetadata, RemoteId,
    StatusSnapshot, SyncStatus,
};
use pawsync_core::exchange::{decode_sessions, encode_sessions};
use pawsync_core::ports::{IRecordStore, IRemoteDirectory, IRemoteTransfer, TokenStore};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::credentials::CredentialLifecycle;
use crate::{SyncError, SyncOutcome};

/// Names and timings the reconciler works with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Drive folder holding the backup
    pub folder_name: String,
    /// Name of the backup file inside the folder
    pub file_name: String,
    /// How long `success` and `error` stay visible before reverting to `idle`
    pub status_display: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            folder_name: "PawSync_Data".to_string(),
            file_name: "pawsync_sessions.csv".to_string(),
            status_display: Duration::from_millis(3000),
        }
    }
}

impl ReconcilerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            folder_name: config.drive.folder_name.clone(),
            file_name: config.drive.file_name.clone(),
            status_display: Duration::from_millis(config.sync.status_display_ms),
        }
    }
}

// ============================================================================
// Status publishing
// ============================================================================

/// Publishes status snapshots and schedules the revert to `idle`
///
/// Every transition bumps `generation`; a scheduled revert only applies if
/// the generation it was scheduled for is still current.
#[derive(Debug)]
struct StatusPublisher {
    tx: watch::Sender<StatusSnapshot>,
    generation: AtomicU64,
    display: Duration,
}

impl StatusPublisher {
    fn new(display: Duration) -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot::default());
        Self {
            tx,
            generation: AtomicU64::new(0),
            display,
        }
    }

    fn publish(self: &Arc<Self>, status: SyncStatus, error: Option<String>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_modify(|snapshot| {
            snapshot.status = status;
            snapshot.error = error;
        });
        debug!(%status, generation, "Sync status changed");

        if status.is_terminal() {
            self.schedule_revert(generation);
        }
    }

    fn schedule_revert(self: &Arc<Self>, generation: u64) {
        let deadline = Instant::now() + self.display;
        let publisher = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            publisher.tx.send_if_modified(|snapshot| {
                if publisher.generation.load(Ordering::SeqCst) != generation {
                    return false;
                }
                snapshot.status = SyncStatus::Idle;
                true
            });
        });
    }

    fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }
}

// ============================================================================
// SyncReconciler
// ============================================================================

/// Keeps the local record set and its Drive backup in step
pub struct SyncReconciler {
    credentials: CredentialLifecycle,
    directory: Arc<dyn IRemoteDirectory>,
    transfer: Arc<dyn IRemoteTransfer>,
    records: Arc<dyn IRecordStore>,
    settings: ReconcilerSettings,
    status: Arc<StatusPublisher>,
    conflict: Mutex<Option<ConflictRecord>>,
    /// Held for the whole of every operation that touches session state
    operation: Mutex<()>,
}

impl std::fmt::Debug for SyncReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncReconciler")
            .field("settings", &self.settings)
            .field("status", &self.status.snapshot())
            .field("in_flight", &self.operation.try_lock().is_err())
            .finish_non_exhaustive()
    }
}

impl SyncReconciler {
    pub fn new(
        credentials: CredentialLifecycle,
        directory: Arc<dyn IRemoteDirectory>,
        transfer: Arc<dyn IRemoteTransfer>,
        records: Arc<dyn IRecordStore>,
        settings: ReconcilerSettings,
    ) -> Self {
        let status = Arc::new(StatusPublisher::new(settings.status_display));
        Self {
            credentials,
            directory,
            transfer,
            records,
            settings,
            status,
            conflict: Mutex::new(None),
            operation: Mutex::new(()),
        }
    }

    pub fn credentials(&self) -> &CredentialLifecycle {
        &self.credentials
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    fn tokens(&self) -> &TokenStore {
        self.credentials.tokens()
    }

    /// Current status and last error
    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Receiver that observes every status change
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.tx.subscribe()
    }

    /// Remote changes awaiting a decision, if any
    pub async fn pending_conflict(&self) -> Option<ConflictRecord> {
        self.conflict.lock().await.clone()
    }

    // ------------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------------

    /// Runs interactive consent; on success the previous error is cleared
    pub async fn connect(&self) -> Result<Credential, SyncError> {
        let credential = self.credentials.connect().await?;
        if self.status().error.is_some() {
            self.status.publish(SyncStatus::Idle, None);
        }
        Ok(credential)
    }

    /// Revokes and forgets the connection, dropping any pending conflict
    ///
    /// Waits for a running operation to finish so that nothing it writes
    /// survives the disconnect.
    pub async fn disconnect(&self) -> Result<(), SyncError> {
        let _operation = self.operation.lock().await;
        self.credentials.disconnect().await?;
        self.conflict.lock().await.take();
        self.status.publish(SyncStatus::Idle, None);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    /// Runs one sync attempt
    pub async fn sync_now(&self) -> SyncOutcome {
        let Ok(_operation) = self.operation.try_lock() else {
            debug!("Sync requested while another operation is running");
            return SyncOutcome::AlreadyInProgress;
        };

        match self.run_sync().await {
            Ok(outcome) => outcome,
            Err(e) => self.fail(e),
        }
    }

    async fn run_sync(&self) -> Result<SyncOutcome, SyncError> {
        // Step 1: a usable credential, before anything is shown as syncing
        let token = self.credentials.valid_credential().await?;

        // Step 2
        self.status.publish(SyncStatus::Syncing, None);
        info!("Sync started");

        // Step 3: folder from cache, else look it up (or create it)
        let folder = self.resolve_folder(&token).await?;

        // Step 4
        let remote = self
            .directory
            .find_file(&token, &folder, &self.settings.file_name)
            .await?;
        let watermark = self.tokens().last_sync()?;

        // Step 5: decide
        match remote {
            Some(metadata) if metadata.changed_since(watermark) => {
                debug!(
                    remote_modified = %metadata.modified_at,
                    %watermark,
                    "Backup changed since last sync"
                );
                self.surface_conflict(&token, metadata).await
            }
            Some(metadata) => {
                self.upload_local(&token, &folder, Some(&metadata.id)).await?;
                self.succeed("Backup updated");
                Ok(SyncOutcome::Overwritten)
            }
            None => {
                self.upload_local(&token, &folder, None).await?;
                self.succeed("Backup created");
                Ok(SyncOutcome::Created)
            }
        }
    }

    async fn resolve_folder(&self, token: &AccessToken) -> Result<FolderId, SyncError> {
        if let Some(folder) = self.tokens().folder_id()? {
            return Ok(folder);
        }

        let folder = self
            .directory
            .find_or_create_folder(token, &self.settings.folder_name)
            .await?;
        self.tokens().save_folder_id(&folder)?;
        info!(folder_id = %folder, "Backup folder cached");
        Ok(folder)
    }

    /// Encodes every local record, uploads it and advances the watermark
    async fn upload_local(
        &self,
        token: &AccessToken,
        folder: &FolderId,
        file_id: Option<&RemoteId>,
    ) -> Result<RemoteId, SyncError> {
        let sessions = self.records.load_all().await?;
        let content = encode_sessions(&sessions)?;

        let written = self
            .transfer
            .upload(token, folder, file_id, &self.settings.file_name, &content)
            .await?;
        self.tokens().save_last_sync(Utc::now())?;

        debug!(file_id = %written, sessions = sessions.len(), "Local sessions uploaded");
        Ok(written)
    }

    async fn surface_conflict(
        &self,
        token: &AccessToken,
        metadata: RemoteFileMetadata,
    ) -> Result<SyncOutcome, SyncError> {
        let content = self.transfer.download(token, &metadata.id).await?;
        let remote_records = decode_sessions(&content)?;
        let remote_count = remote_records.len();

        *self.conflict.lock().await = Some(ConflictRecord {
            remote_file_id: metadata.id,
            remote_modified_at: metadata.modified_at,
            remote_records,
        });
        self.status.publish(SyncStatus::Idle, None);

        info!(remote_count, "Conflict detected, waiting for a decision");
        Ok(SyncOutcome::ConflictDetected { remote_count })
    }

    // ------------------------------------------------------------------------
    // Conflict resolution
    // ------------------------------------------------------------------------

    /// Replaces local records with the pending remote ones
    pub async fn accept_remote(&self) -> SyncOutcome {
        let Ok(_operation) = self.operation.try_lock() else {
            return SyncOutcome::AlreadyInProgress;
        };
        let Some(conflict) = self.conflict.lock().await.take() else {
            return SyncOutcome::NothingToResolve;
        };

        let record_count = conflict.remote_records.len();
        let applied = async {
            self.records.replace_all(conflict.remote_records).await?;
            self.tokens().save_last_sync(Utc::now())?;
            Ok::<_, SyncError>(())
        }
        .await;

        match applied {
            Ok(()) => {
                self.succeed("Local sessions replaced by backup");
                SyncOutcome::AcceptedRemote { record_count }
            }
            Err(e) => self.fail(e),
        }
    }

    /// Overwrites the conflicting backup with local records
    ///
    /// The pending conflict is dropped before any network call, and the
    /// modification-time check is skipped.
    pub async fn keep_local(&self) -> SyncOutcome {
        let Ok(_operation) = self.operation.try_lock() else {
            return SyncOutcome::AlreadyInProgress;
        };
        let Some(conflict) = self.conflict.lock().await.take() else {
            return SyncOutcome::NothingToResolve;
        };

        match self.force_upload(&conflict.remote_file_id).await {
            Ok(()) => {
                self.succeed("Backup overwritten with local sessions");
                SyncOutcome::Overwritten
            }
            Err(e) => self.fail(e),
        }
    }

    async fn force_upload(&self, file_id: &RemoteId) -> Result<(), SyncError> {
        let token = self.credentials.valid_credential().await?;
        let folder = self.tokens().folder_id()?.ok_or(SyncError::NoFolderCached)?;

        self.status.publish(SyncStatus::Syncing, None);
        self.upload_local(&token, &folder, Some(file_id)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Terminal transitions
    // ------------------------------------------------------------------------

    fn succeed(&self, what: &str) {
        info!(result = what, "Sync finished");
        self.status.publish(SyncStatus::Success, None);
    }

    fn fail(&self, err: SyncError) -> SyncOutcome {
        if err.is_credential_rejected() {
            warn!("Access token rejected by Google Drive; clearing it");
            if let Err(e) = self.credentials.invalidate() {
                error!(error = %e, "Failed to clear rejected credential");
            }
        }

        let message = err.to_string();
        error!(error = %message, "Sync failed");
        self.status.publish(SyncStatus::Error, Some(message.clone()));
        SyncOutcome::Failed(message)
    }
}
