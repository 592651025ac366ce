//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteDirectory`] - Folder and file lookup on the remote storage
//! - [`IRemoteTransfer`] - Upload and download of the backup file
//! - [`IConsentProvider`] - Interactive authorization, renewal and revocation
//! - [`ISessionStore`] - Key-value persistence of credential, folder and watermark
//! - [`IRecordStore`] - The local training-session list

pub mod consent;
pub mod record_store;
pub mod remote;
pub mod session_store;

pub use consent::{ConsentError, Grant, IConsentProvider, UnconfiguredConsent};
pub use record_store::{InMemoryRecordStore, IRecordStore};
pub use remote::{IRemoteDirectory, IRemoteTransfer, RemoteError};
pub use session_store::{ISessionStore, InMemorySessionStore, SessionKey, TokenStore};
