//! CLI subcommands and the wiring they share

pub mod auth;
pub mod config;
pub mod sessions;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use pawsync_core::config::Config;
use pawsync_core::ports::{IConsentProvider, TokenStore, UnconfiguredConsent};
use pawsync_drive::auth::GoogleConsentAdapter;
use pawsync_drive::client::DriveClient;
use pawsync_drive::provider::GoogleDriveProvider;
use pawsync_store::records::JsonRecordStore;
use pawsync_store::open_session_store;
use pawsync_sync::{CredentialLifecycle, ReconcilerSettings, SyncReconciler};
use tracing::debug;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Settings every command runs with
#[derive(Debug)]
pub struct CliContext {
    pub config_path: PathBuf,
    pub config: Config,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl CliContext {
    pub fn new(config_path: PathBuf, config: Config, format: OutputFormat, quiet: bool) -> Self {
        Self {
            config_path,
            config,
            format,
            quiet,
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Local session list backed by `sessions.json`
    pub fn record_store(&self) -> Arc<JsonRecordStore> {
        Arc::new(JsonRecordStore::new(self.config.records_path()))
    }

    /// Reconciler wired to Google Drive and the configured stores
    pub fn reconciler(&self) -> Result<SyncReconciler> {
        let config = &self.config;

        let session_store =
            open_session_store(&config.storage).context("Failed to open session store")?;
        let tokens = TokenStore::new(session_store);

        let credentials = CredentialLifecycle::new(self.consent_provider(), tokens)
            .with_expiry_buffer(chrono::Duration::seconds(config.auth.expiry_buffer_secs));

        let client = DriveClient::from_config(&config.drive)?;
        let provider = Arc::new(GoogleDriveProvider::new(client));

        Ok(SyncReconciler::new(
            credentials,
            provider.clone(),
            provider,
            self.record_store(),
            ReconcilerSettings::from_config(config),
        ))
    }

    fn consent_provider(&self) -> Arc<dyn IConsentProvider> {
        match GoogleConsentAdapter::from_auth_config(&self.config.auth) {
            Ok(adapter) => {
                let json = self.is_json();
                Arc::new(adapter.with_authorize_url_hook(Arc::new(move |url: &str| {
                    if !json {
                        eprintln!("If the browser does not open, visit:\n  {url}");
                    }
                })))
            }
            Err(e) => {
                debug!(error = %e, "OAuth client not configured");
                Arc::new(UnconfiguredConsent)
            }
        }
    }
}
