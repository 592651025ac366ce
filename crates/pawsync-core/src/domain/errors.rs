//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures when constructing newtypes.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Access token is empty or malformed
    #[error("Invalid access token: {0}")]
    InvalidAccessToken(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Unknown anxiety score label or value
    #[error("Invalid anxiety score: {0}")]
    InvalidAnxietyScore(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
