//! JSON-file record store
//!
//! The training-session list is stored as a single pretty-printed JSON
//! array. Loads and replacements always cover the whole list.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pawsync_core::domain::TrainingSession;
use pawsync_core::ports::IRecordStore;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::tmp_path;

/// Record store persisted as a JSON document
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    /// Serializes writers within this process
    write_lock: Mutex<()>,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl IRecordStore for JsonRecordStore {
    async fn load_all(&self) -> Result<Vec<TrainingSession>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No record file yet");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read {}", self.path.display())))
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let sessions: Vec<TrainingSession> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        debug!(count = sessions.len(), "Loaded training sessions");
        Ok(sessions)
    }

    async fn replace_all(&self, sessions: Vec<TrainingSession>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let json =
            serde_json::to_vec_pretty(&sessions).context("Failed to serialize sessions")?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        info!(count = sessions.len(), "Saved training sessions");
        Ok(())
    }
}
