//! Auth commands - Connect, Disconnect and Status for Google Drive
//!
//! 1. `connect`    - Runs the browser consent flow and stores the credential.
//! 2. `disconnect` - Revokes the token (best effort) and forgets the
//!    credential, the cached folder and the last-sync watermark.
//! 3. `status`     - Shows whether a credential is stored and when it expires.

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use pawsync_core::ports::ConsentError;
use pawsync_sync::SyncError;
use tracing::info;

use super::CliContext;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authorize PawSync to store its backup in Google Drive
    Connect,
    /// Revoke access and remove stored credentials
    Disconnect,
    /// Check connection status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            AuthCommand::Connect => self.execute_connect(ctx).await,
            AuthCommand::Disconnect => self.execute_disconnect(ctx).await,
            AuthCommand::Status => self.execute_status(ctx),
        }
    }

    async fn execute_connect(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let reconciler = ctx.reconciler()?;

        fmt.info("Opening browser for Google sign-in...");
        match reconciler.connect().await {
            Ok(credential) => {
                info!("Google Drive connected");
                if ctx.is_json() {
                    fmt.print_json(&serde_json::json!({
                        "success": true,
                        "connected": true,
                        "expires_at": credential.expires_at().to_rfc3339(),
                        "renewable": credential.refresh_token().is_some(),
                    }));
                } else {
                    fmt.success("Connected to Google Drive");
                    fmt.info(&format!(
                        "Access token valid until {}",
                        credential.expires_at().format("%Y-%m-%d %H:%M:%S UTC")
                    ));
                }
            }
            Err(SyncError::Consent(ConsentError::NotConfigured)) => {
                fmt.error("Google Drive integration is not available.");
                fmt.info(&format!(
                    "Set auth.client_id in {} (or run 'pawsync config set auth.client_id <id>')",
                    ctx.config_path.display()
                ));
            }
            Err(e) => fmt.error(&format!("Authentication failed: {e}")),
        }
        Ok(())
    }

    async fn execute_disconnect(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let reconciler = ctx.reconciler()?;

        if !reconciler.credentials().is_connected()? {
            fmt.info("Not connected. Clearing any leftover sync state.");
        }
        reconciler.disconnect().await?;
        fmt.success("Disconnected from Google Drive");
        Ok(())
    }

    fn execute_status(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let reconciler = ctx.reconciler()?;
        let tokens = reconciler.credentials().tokens();

        let credential = reconciler.credentials().current()?;
        let folder = tokens.folder_id()?;
        let last_sync = tokens.last_sync()?;
        let synced = last_sync.timestamp_millis() > 0;

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "connected": credential.is_some(),
                "expires_at": credential.as_ref().map(|c| c.expires_at().to_rfc3339()),
                "expired": credential.as_ref().map(|c| !c.is_valid_at(Utc::now())),
                "renewable": credential.as_ref().map(|c| c.refresh_token().is_some()),
                "folder_id": folder.as_ref().map(|f| f.to_string()),
                "last_sync": synced.then(|| last_sync.to_rfc3339()),
            }));
            return Ok(());
        }

        match &credential {
            None => {
                fmt.info("Not connected to Google Drive.");
                fmt.info("Run 'pawsync auth connect' to connect.");
            }
            Some(credential) if credential.is_valid_at(Utc::now()) => {
                fmt.success("Connected to Google Drive");
                fmt.info(&format!(
                    "Token expires: {}",
                    credential.expires_at().format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            Some(credential) => {
                fmt.warn("Access token expired");
                if credential.refresh_token().is_some() {
                    fmt.info("It will be renewed on the next sync.");
                } else {
                    fmt.info("Run 'pawsync auth connect' to reconnect.");
                }
            }
        }

        if let Some(folder) = folder {
            fmt.info(&format!("Backup folder id: {folder}"));
        }
        if synced {
            fmt.info(&format!(
                "Last sync: {}",
                last_sync.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        } else {
            fmt.info("Last sync: never");
        }
        Ok(())
    }
}
