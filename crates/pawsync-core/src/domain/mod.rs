//! Domain entities and business logic
//!
//! This module contains the core domain types for PawSync:
//! - Newtypes for type-safe identifiers and opaque remote references
//! - Training session records (the data being backed up)
//! - The OAuth credential and its validity rules
//! - Sync status, remote file metadata and conflict records
//! - Domain-specific error types

pub mod credential;
pub mod errors;
pub mod newtypes;
pub mod session;
pub mod sync_state;

// Re-export commonly used types
pub use credential::{Credential, DEFAULT_EXPIRY_BUFFER_SECS};
pub use errors::DomainError;
pub use newtypes::*;
pub use session::{AnxietyScore, Step, TrainingSession};
pub use sync_state::{ConflictRecord, RemoteFileMetadata, StatusSnapshot, SyncStatus};
