//! Sessions commands - Inspect and move the local training sessions
//!
//! `export` and `import` use the same CSV format as the Drive backup, so a
//! file written by one device can be imported on another by hand.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use pawsync_core::domain::TrainingSession;
use pawsync_core::exchange::{decode_sessions, encode_sessions};
use pawsync_core::ports::IRecordStore;
use tracing::info;

use super::CliContext;

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// List stored sessions
    List,
    /// Write all sessions to a CSV file
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Add the sessions from a CSV file to the stored ones
    Import {
        /// Source file
        path: PathBuf,
    },
}

impl SessionsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            SessionsCommand::List => self.execute_list(ctx).await,
            SessionsCommand::Export { path } => self.execute_export(ctx, path).await,
            SessionsCommand::Import { path } => self.execute_import(ctx, path).await,
        }
    }

    async fn execute_list(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let sessions = ctx.record_store().load_all().await?;

        if ctx.is_json() {
            let json = serde_json::to_value(&sessions).context("Failed to serialize sessions")?;
            fmt.print_json(&json);
            return Ok(());
        }

        if sessions.is_empty() {
            fmt.info("No training sessions recorded.");
            return Ok(());
        }

        fmt.success(&format!("{} training sessions", sessions.len()));
        for session in &sessions {
            fmt.info(&describe(session));
        }
        Ok(())
    }

    async fn execute_export(&self, ctx: &CliContext, path: &Path) -> Result<()> {
        let fmt = ctx.formatter();
        let sessions = ctx.record_store().load_all().await?;
        let csv = encode_sessions(&sessions)?;

        tokio::fs::write(path, csv)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), sessions = sessions.len(), "Exported sessions");
        fmt.success(&format!(
            "Exported {} sessions to {}",
            sessions.len(),
            path.display()
        ));
        Ok(())
    }

    async fn execute_import(&self, ctx: &CliContext, path: &Path) -> Result<()> {
        let fmt = ctx.formatter();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let sessions = decode_sessions(&content)
            .with_context(|| format!("{} is not a PawSync export", path.display()))?;
        let count = sessions.len();

        let total = append_sessions(ctx.record_store().as_ref(), sessions).await?;

        info!(path = %path.display(), sessions = count, total, "Imported sessions");
        fmt.success(&format!(
            "Imported {count} sessions from {} ({total} stored)",
            path.display()
        ));
        Ok(())
    }
}

/// Adds `imported` after the stored sessions; returns the new total
async fn append_sessions(
    store: &dyn IRecordStore,
    imported: Vec<TrainingSession>,
) -> Result<usize> {
    let mut sessions = store
        .load_all()
        .await
        .context("Failed to load local sessions")?;
    sessions.extend(imported);
    let total = sessions.len();
    store
        .replace_all(sessions)
        .await
        .context("Failed to save imported sessions")?;
    Ok(total)
}

/// One-line summary of a session
fn describe(session: &TrainingSession) -> String {
    let minutes = session.total_duration_seconds / 60;
    let seconds = session.total_duration_seconds % 60;
    let mut line = format!(
        "{}  {:>2}m{:02}s  {}/{} steps  {}",
        session.date.format("%Y-%m-%d %H:%M"),
        minutes,
        seconds,
        session.completed_steps(),
        session.steps.len(),
        if session.completed { "completed" } else { "stopped" },
    );
    if let Some(score) = session.anxiety_score {
        line.push_str(&format!("  [{}]", score.label()));
    }
    if let Some(notes) = &session.notes {
        line.push_str(&format!("  {notes}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pawsync_core::domain::{AnxietyScore, Step};
    use pawsync_store::records::JsonRecordStore;

    #[test]
    fn test_describe_session() {
        let date = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        let session = TrainingSession::new(date, vec![Step::new(30, true), Step::new(65, true)])
            .with_anxiety_score(AnxietyScore::Calm)
            .with_notes("good boy");

        assert_eq!(
            describe(&session),
            "2024-06-15 09:30   1m35s  2/2 steps  completed  [Calm]  good boy"
        );
    }

    #[tokio::test]
    async fn test_import_keeps_existing_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().join("sessions.json"));
        let day = |d| Utc.with_ymd_and_hms(2024, 6, d, 9, 30, 0).unwrap();
        let existing = TrainingSession::new(day(1), vec![Step::new(30, true)]);
        store.replace_all(vec![existing.clone()]).await.unwrap();

        let csv = encode_sessions(&[TrainingSession::new(day(2), vec![Step::new(60, true)])])
            .unwrap();
        let imported = decode_sessions(&csv).unwrap();

        assert_eq!(append_sessions(&store, imported).await.unwrap(), 2);

        let stored = store.load_all().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0], existing);
        assert_eq!(stored[1].date, day(2));
    }
}
