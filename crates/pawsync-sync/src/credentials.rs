//! Credential lifecycle
//!
//! Owns the stored [`Credential`]: obtaining it through interactive consent,
//! handing out a usable access token, renewing it without user interaction
//! and dropping it again.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pawsync_core::domain::{AccessToken, Credential, DEFAULT_EXPIRY_BUFFER_SECS};
use pawsync_core::ports::{IConsentProvider, TokenStore};
use tracing::{debug, info, warn};

use crate::SyncError;

/// Obtains, renews and discards the Drive credential
#[derive(Clone)]
pub struct CredentialLifecycle {
    consent: Arc<dyn IConsentProvider>,
    tokens: TokenStore,
    expiry_buffer: Duration,
}

impl std::fmt::Debug for CredentialLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialLifecycle")
            .field("expiry_buffer", &self.expiry_buffer)
            .finish_non_exhaustive()
    }
}

impl CredentialLifecycle {
    pub fn new(consent: Arc<dyn IConsentProvider>, tokens: TokenStore) -> Self {
        Self {
            consent,
            tokens,
            expiry_buffer: Duration::seconds(DEFAULT_EXPIRY_BUFFER_SECS),
        }
    }

    /// Sets the safety margin subtracted from every granted lifetime
    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Runs interactive consent and stores the resulting credential
    ///
    /// A failed consent leaves the stored state untouched.
    pub async fn connect(&self) -> Result<Credential, SyncError> {
        let grant = self.consent.request_consent().await?;
        let credential = Credential::from_lifetime(
            grant.access_token,
            grant.refresh_token,
            grant.expires_in,
            self.expiry_buffer,
            Utc::now(),
        );
        self.tokens.save_credential(&credential)?;

        info!(
            expires_at = %credential.expires_at(),
            renewable = credential.refresh_token().is_some(),
            "Connected to Google Drive"
        );
        Ok(credential)
    }

    /// Returns an access token that is valid right now
    pub async fn valid_credential(&self) -> Result<AccessToken, SyncError> {
        self.valid_credential_at(Utc::now()).await
    }

    /// Returns an access token that is valid at `now`
    ///
    /// An expired token is renewed with the refresh token when there is one.
    /// Without a refresh token, or when renewal fails, the credential is
    /// cleared and [`SyncError::SessionExpired`] is returned. Interactive
    /// consent is never started from here.
    pub async fn valid_credential_at(&self, now: DateTime<Utc>) -> Result<AccessToken, SyncError> {
        let Some(credential) = self.tokens.load_credential()? else {
            return Err(SyncError::NotConnected);
        };

        if credential.is_valid_at(now) {
            return Ok(credential.access_token().clone());
        }

        let Some(refresh_token) = credential.refresh_token() else {
            info!("Credential expired and cannot be renewed");
            self.tokens.clear_credential()?;
            return Err(SyncError::SessionExpired);
        };

        debug!(expired_at = %credential.expires_at(), "Renewing expired credential");
        let grant = match self.consent.refresh(refresh_token).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "Credential renewal failed");
                self.tokens.clear_credential()?;
                return Err(SyncError::SessionExpired);
            }
        };

        let renewed = Credential::from_lifetime(
            grant.access_token,
            grant.refresh_token,
            grant.expires_in,
            self.expiry_buffer,
            now,
        )
        .inherit_refresh_token(Some(refresh_token));
        self.tokens.save_credential(&renewed)?;

        info!(expires_at = %renewed.expires_at(), "Credential renewed");
        Ok(renewed.access_token().clone())
    }

    /// Drops the stored credential, keeping folder cache and watermark
    pub fn invalidate(&self) -> Result<(), SyncError> {
        self.tokens.clear_credential()?;
        info!("Stored credential cleared");
        Ok(())
    }

    /// Revokes the credential (best effort) and clears every session field
    pub async fn disconnect(&self) -> Result<(), SyncError> {
        if let Some(credential) = self.tokens.load_credential()? {
            if let Err(e) = self.consent.revoke(credential.access_token()).await {
                warn!(error = %e, "Token revocation failed; clearing local state anyway");
            }
        }
        self.tokens.clear_all()?;
        info!("Disconnected from Google Drive");
        Ok(())
    }

    /// Returns true if a credential is stored, valid or not
    pub fn is_connected(&self) -> Result<bool, SyncError> {
        Ok(self.tokens.load_credential()?.is_some())
    }

    /// The stored credential, if any
    pub fn current(&self) -> Result<Option<Credential>, SyncError> {
        Ok(self.tokens.load_credential()?)
    }
}
