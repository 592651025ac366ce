//! Local record store port
//!
//! The record set is always handled as a whole: sync encodes every local
//! session and a conflict resolution replaces all of them at once.

use anyhow::Result;
use tokio::sync::RwLock;

use crate::domain::TrainingSession;

/// Port trait for the local training-session list
#[async_trait::async_trait]
pub trait IRecordStore: Send + Sync {
    /// Returns every stored session in insertion order
    async fn load_all(&self) -> Result<Vec<TrainingSession>>;

    /// Replaces the whole stored set
    async fn replace_all(&self, sessions: Vec<TrainingSession>) -> Result<()>;
}

/// Volatile record store
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    sessions: RwLock<Vec<TrainingSession>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: Vec<TrainingSession>) -> Self {
        Self {
            sessions: RwLock::new(sessions),
        }
    }
}

#[async_trait::async_trait]
impl IRecordStore for InMemoryRecordStore {
    async fn load_all(&self) -> Result<Vec<TrainingSession>> {
        Ok(self.sessions.read().await.clone())
    }

    async fn replace_all(&self, sessions: Vec<TrainingSession>) -> Result<()> {
        *self.sessions.write().await = sessions;
        Ok(())
    }
}
