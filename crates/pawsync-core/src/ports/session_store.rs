//! Session state port
//!
//! The credential, the cached folder reference and the last-sync watermark
//! are small process-wide values persisted between runs. Adapters only
//! provide string key-value storage through [`ISessionStore`]; the typed
//! [`TokenStore`] wrapper owns the encoding of each field.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

use crate::domain::newtypes::FolderId;
use crate::domain::Credential;

/// Keys of the persisted session fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// JSON-encoded [`Credential`]
    Credential,
    /// Remote folder holding the backup file
    FolderId,
    /// Watermark as integer epoch milliseconds
    LastSync,
}

impl SessionKey {
    pub const ALL: [SessionKey; 3] = [
        SessionKey::Credential,
        SessionKey::FolderId,
        SessionKey::LastSync,
    ];

    /// Storage key name
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::Credential => "drive_credential",
            SessionKey::FolderId => "drive_folder_id",
            SessionKey::LastSync => "drive_last_sync",
        }
    }
}

/// Port trait for string key-value persistence of session fields
pub trait ISessionStore: Send + Sync {
    fn get(&self, key: SessionKey) -> Result<Option<String>>;

    fn set(&self, key: SessionKey, value: &str) -> Result<()>;

    /// Removes the key; removing an absent key is not an error
    fn remove(&self, key: SessionKey) -> Result<()>;
}

/// Volatile session store, used when nothing must survive the process
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    values: Mutex<HashMap<SessionKey, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ISessionStore for InMemorySessionStore {
    fn get(&self, key: SessionKey) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        Ok(values.get(&key).cloned())
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: SessionKey) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        values.remove(&key);
        Ok(())
    }
}

/// Typed access to the persisted session fields
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<dyn ISessionStore>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(inner: Arc<dyn ISessionStore>) -> Self {
        Self { inner }
    }

    /// Store backed by [`InMemorySessionStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySessionStore::new()))
    }

    /// Loads the stored credential
    ///
    /// A value that no longer parses is treated as absent, so a corrupted
    /// entry behaves like a disconnected state instead of a hard failure.
    pub fn load_credential(&self) -> Result<Option<Credential>> {
        let Some(raw) = self.inner.get(SessionKey::Credential)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Credential>(&raw) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed stored credential");
                Ok(None)
            }
        }
    }

    pub fn save_credential(&self, credential: &Credential) -> Result<()> {
        let json = serde_json::to_string(credential).context("Failed to serialize credential")?;
        self.inner.set(SessionKey::Credential, &json)
    }

    pub fn clear_credential(&self) -> Result<()> {
        self.inner.remove(SessionKey::Credential)
    }

    /// Cached folder reference, if any
    pub fn folder_id(&self) -> Result<Option<FolderId>> {
        let Some(raw) = self.inner.get(SessionKey::FolderId)? else {
            return Ok(None);
        };
        match FolderId::new(raw) {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed cached folder id");
                Ok(None)
            }
        }
    }

    pub fn save_folder_id(&self, folder: &FolderId) -> Result<()> {
        self.inner.set(SessionKey::FolderId, folder.as_str())
    }

    /// Last-sync watermark; absent or unreadable values read as the Unix epoch
    pub fn last_sync(&self) -> Result<DateTime<Utc>> {
        let raw = self.inner.get(SessionKey::LastSync)?;
        let millis = raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(0);
        Ok(Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH))
    }

    pub fn save_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        self.inner
            .set(SessionKey::LastSync, &at.timestamp_millis().to_string())
    }

    /// Removes every session field
    pub fn clear_all(&self) -> Result<()> {
        for key in SessionKey::ALL {
            self.inner
                .remove(key)
                .with_context(|| format!("Failed to clear {}", key.as_str()))?;
        }
        Ok(())
    }
}
