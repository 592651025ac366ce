//! Consent provider port (driven/secondary port)
//!
//! Wraps the interactive OAuth authorization with the remote authority.
//! The whole browser round-trip is a single awaitable call; renewal and
//! revocation are non-interactive.

use chrono::Duration;
use thiserror::Error;

use crate::domain::newtypes::AccessToken;

/// Errors of the consent flow
///
/// None of these changes stored state: a failed connect leaves the
/// previous credential (or its absence) untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsentError {
    /// The user declined authorization
    #[error("Authorization denied: {0}")]
    Denied(String),

    /// No browser could be opened for the consent page
    #[error("Could not open a browser for authorization: {0}")]
    BrowserUnavailable(String),

    /// The consent flow could not get ready (e.g. callback listener unavailable)
    #[error("Authorization flow not ready: {0}")]
    NotReady(String),

    /// No OAuth client id has been configured
    #[error("Google Drive client id is not configured")]
    NotConfigured,

    /// Any other failure (state mismatch, token endpoint error, timeout)
    #[error("Authorization failed: {0}")]
    Failed(String),
}

/// Tokens handed out by the authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub access_token: AccessToken,
    pub refresh_token: Option<String>,
    /// Lifetime of the access token as reported by the authority
    pub expires_in: Duration,
}

/// Port trait for obtaining, renewing and revoking authorization
#[async_trait::async_trait]
pub trait IConsentProvider: Send + Sync {
    /// Runs the interactive consent flow and returns the granted tokens
    async fn request_consent(&self) -> Result<Grant, ConsentError>;

    /// Exchanges a refresh token for a new access token without user interaction
    async fn refresh(&self, refresh_token: &str) -> Result<Grant, ConsentError>;

    /// Revokes the token with the authority
    async fn revoke(&self, token: &AccessToken) -> Result<(), ConsentError>;
}

/// Consent provider used while no OAuth client is configured
///
/// Every call fails with [`ConsentError::NotConfigured`], so a stored token
/// keeps working until it expires but can be neither renewed nor revoked.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredConsent;

#[async_trait::async_trait]
impl IConsentProvider for UnconfiguredConsent {
    async fn request_consent(&self) -> Result<Grant, ConsentError> {
        Err(ConsentError::NotConfigured)
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Grant, ConsentError> {
        Err(ConsentError::NotConfigured)
    }

    async fn revoke(&self, _token: &AccessToken) -> Result<(), ConsentError> {
        Err(ConsentError::NotConfigured)
    }
}
