//! Sync command - Back up training sessions to Google Drive
//!
//! Runs one reconciliation attempt. When the backup was changed from another
//! device since the last sync, the conflict is resolved according to
//! `--on-conflict`; `ask` prompts on the terminal.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use pawsync_core::domain::ConflictRecord;
use pawsync_core::ports::IRecordStore;
use pawsync_sync::{SyncOutcome, SyncReconciler};
use tracing::info;

use super::CliContext;
use crate::output::OutputFormatter;

/// What to do when the remote backup changed since the last sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictChoice {
    /// Prompt for a decision
    Ask,
    /// Overwrite the backup with local sessions
    KeepLocal,
    /// Replace local sessions with the backup
    AcceptRemote,
    /// Leave both sides untouched
    Abort,
}

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Conflict resolution when the backup changed on another device
    #[arg(long, value_enum, default_value_t = ConflictChoice::Ask)]
    pub on_conflict: ConflictChoice,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let reconciler = ctx.reconciler()?;

        let outcome = reconciler.sync_now().await;
        info!(?outcome, "Sync attempt finished");

        let outcome = match outcome {
            SyncOutcome::ConflictDetected { .. } => {
                match reconciler.pending_conflict().await {
                    Some(conflict) => self.resolve(ctx, &reconciler, &conflict, &*fmt).await?,
                    None => outcome,
                }
            }
            other => other,
        };

        report(ctx, &outcome, &*fmt);
        Ok(())
    }

    async fn resolve(
        &self,
        ctx: &CliContext,
        reconciler: &SyncReconciler,
        conflict: &ConflictRecord,
        fmt: &dyn OutputFormatter,
    ) -> Result<SyncOutcome> {
        let local_count = count_local_sessions(ctx.record_store().as_ref()).await?;

        let choice = match self.on_conflict {
            // A JSON consumer cannot answer a prompt
            ConflictChoice::Ask if ctx.is_json() => ConflictChoice::Abort,
            ConflictChoice::Ask => {
                fmt.warn("The backup was changed on another device since your last sync.");
                fmt.info(&format!(
                    "Backup: {} sessions (modified {})",
                    conflict.remote_records.len(),
                    conflict.remote_modified_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
                fmt.info(&format!("This device: {local_count} sessions"));
                prompt_choice()?
            }
            choice => choice,
        };

        Ok(match choice {
            ConflictChoice::KeepLocal => reconciler.keep_local().await,
            ConflictChoice::AcceptRemote => reconciler.accept_remote().await,
            ConflictChoice::Ask | ConflictChoice::Abort => SyncOutcome::ConflictDetected {
                remote_count: conflict.remote_records.len(),
            },
        })
    }
}

async fn count_local_sessions(store: &dyn IRecordStore) -> Result<usize> {
    Ok(store
        .load_all()
        .await
        .context("Failed to load local sessions")?
        .len())
}

fn prompt_choice() -> Result<ConflictChoice> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("Keep [l]ocal, use [r]emote, or [a]bort? ");
        stdout.flush().context("Failed to write prompt")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("Failed to read answer")? == 0 {
            return Ok(ConflictChoice::Abort);
        }
        if let Some(choice) = parse_answer(&line) {
            return Ok(choice);
        }
    }
}

fn parse_answer(answer: &str) -> Option<ConflictChoice> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "l" | "local" | "keep-local" => Some(ConflictChoice::KeepLocal),
        "r" | "remote" | "accept-remote" => Some(ConflictChoice::AcceptRemote),
        "a" | "abort" | "" => Some(ConflictChoice::Abort),
        _ => None,
    }
}

fn report(ctx: &CliContext, outcome: &SyncOutcome, fmt: &dyn OutputFormatter) {
    if ctx.is_json() {
        fmt.print_json(&outcome_json(outcome));
        return;
    }

    match outcome {
        SyncOutcome::Failed(message) => fmt.error(message),
        SyncOutcome::ConflictDetected { .. } => {
            fmt.warn(&outcome.to_string());
            fmt.info("Nothing was changed. Run 'pawsync sync --on-conflict keep-local' or '--on-conflict accept-remote' to decide.");
        }
        SyncOutcome::AlreadyInProgress | SyncOutcome::NothingToResolve => {
            fmt.info(&outcome.to_string())
        }
        SyncOutcome::Created | SyncOutcome::Overwritten | SyncOutcome::AcceptedRemote { .. } => {
            fmt.success(&outcome.to_string())
        }
    }
}

fn outcome_json(outcome: &SyncOutcome) -> serde_json::Value {
    let (name, extra) = match outcome {
        SyncOutcome::Created => ("created", serde_json::Value::Null),
        SyncOutcome::Overwritten => ("overwritten", serde_json::Value::Null),
        SyncOutcome::ConflictDetected { remote_count } => {
            ("conflict", serde_json::json!({ "remote_count": remote_count }))
        }
        SyncOutcome::AcceptedRemote { record_count } => (
            "accepted_remote",
            serde_json::json!({ "record_count": record_count }),
        ),
        SyncOutcome::Failed(message) => ("failed", serde_json::json!({ "error": message })),
        SyncOutcome::AlreadyInProgress => ("already_in_progress", serde_json::Value::Null),
        SyncOutcome::NothingToResolve => ("nothing_to_resolve", serde_json::Value::Null),
    };

    let mut value = serde_json::json!({
        "success": !outcome.is_failure(),
        "outcome": name,
    });
    if let (Some(target), serde_json::Value::Object(fields)) = (value.as_object_mut(), extra) {
        target.extend(fields);
    }
    value
}
