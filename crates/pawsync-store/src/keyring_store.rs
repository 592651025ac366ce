//! Keyring-backed session store
//!
//! Uses the `keyring` crate to keep each session field in the OS credential
//! store (GNOME Keyring, KDE Wallet, macOS Keychain). Every field is its
//! own entry with the service name "pawsync" and the key name as username.

use anyhow::{Context, Result};
use pawsync_core::ports::{ISessionStore, SessionKey};
use tracing::debug;

/// Default keyring service name
const KEYRING_SERVICE: &str = "pawsync";

/// Session store backed by the system keyring
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service: String,
}

impl KeyringSessionStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Uses a custom service name (keeps test entries apart from real ones)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: SessionKey) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key.as_str()).context("Failed to create keyring entry")
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ISessionStore for KeyringSessionStore {
    fn get(&self, key: SessionKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => {
                debug!(key = key.as_str(), "Loaded session field from keyring");
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keyring")?;
        debug!(key = key.as_str(), "Stored session field in keyring");
        Ok(())
    }

    fn remove(&self, key: SessionKey) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!(key = key.as_str(), "Cleared session field from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}
