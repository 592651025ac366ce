//! File-backed session store
//!
//! Keeps the session fields as a flat JSON object keyed by
//! [`SessionKey::as_str`]. Every mutation rewrites the whole (tiny) file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use pawsync_core::ports::{ISessionStore, SessionKey};
use tracing::{debug, warn};

use crate::write_atomic;

/// Session store persisted as a private JSON file
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read {}", self.path.display())))
            }
        };

        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                // Unreadable state behaves like a fresh install
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt session state");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(map).context("Failed to serialize session state")?;
        write_atomic(&self.path, &json)
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("session state lock poisoned"))?;
        let mut map = self.read_map()?;
        if f(&mut map) {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

impl ISessionStore for FileSessionStore {
    fn get(&self, key: SessionKey) -> Result<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("session state lock poisoned"))?;
        Ok(self.read_map()?.remove(key.as_str()))
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<()> {
        debug!(key = key.as_str(), "Persisting session field");
        self.update(|map| {
            map.insert(key.as_str().to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: SessionKey) -> Result<()> {
        self.update(|map| {
            let removed = map.remove(key.as_str()).is_some();
            if removed {
                debug!(key = key.as_str(), "Removed session field");
            }
            removed
        })
    }
}
