//! PawSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `TrainingSession`, `Credential`, `ConflictRecord`, `SyncStatus`
//! - **Port definitions** - Traits for adapters: `IRemoteDirectory`, `IRemoteTransfer`,
//!   `IConsentProvider`, `ISessionStore`, `IRecordStore`
//! - **Exchange format** - CSV encoding of the full training-session set
//! - **Configuration** - YAML-backed settings shared by all crates
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! The sync crate orchestrates domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod exchange;
pub mod ports;
