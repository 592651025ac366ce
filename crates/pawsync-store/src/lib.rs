//! PawSync Store - Local persistence adapters
//!
//! Implements the core persistence ports:
//! - [`FileSessionStore`] - session fields in a private JSON file
//! - [`KeyringSessionStore`] - session fields in the system keyring
//! - [`JsonRecordStore`] - the training-session list as a JSON document
//!
//! File writes go through a temporary sibling file and a rename, so a crash
//! mid-write never leaves a truncated document behind.

pub mod file_store;
pub mod keyring_store;
pub mod records;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use pawsync_core::config::StorageConfig;
use pawsync_core::ports::ISessionStore;

pub use file_store::FileSessionStore;
pub use keyring_store::KeyringSessionStore;
pub use records::JsonRecordStore;

/// File name of the file-backed session state inside `storage.data_dir`
pub const SESSION_STATE_FILE: &str = "session_state.json";

/// Opens the session store selected by `storage.backend`
pub fn open_session_store(config: &StorageConfig) -> Result<Arc<dyn ISessionStore>> {
    match config.backend.as_str() {
        "file" => Ok(Arc::new(FileSessionStore::new(
            config.data_dir.join(SESSION_STATE_FILE),
        ))),
        "keyring" => Ok(Arc::new(KeyringSessionStore::new())),
        other => bail!("Unknown storage backend '{other}'"),
    }
}

/// Path of the temporary sibling used for atomic writes
pub(crate) fn tmp_path(target: &Path) -> PathBuf {
    let mut p = target.as_os_str().to_owned();
    p.push(".tmp");
    PathBuf::from(p)
}

/// Writes `data` to `target` via temp file + rename (blocking)
pub(crate) fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let tmp = tmp_path(target);
    std::fs::write(&tmp, data).with_context(|| format!("Failed to write {}", tmp.display()))?;
    restrict_permissions(&tmp)?;
    std::fs::rename(&tmp, target)
        .with_context(|| format!("Failed to replace {}", target.display()))?;
    Ok(())
}

/// Session state holds a bearer token: keep it readable by the owner only
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
