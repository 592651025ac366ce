//! Config command - View and manage PawSync configuration
//!
//! 1. `show`     - Prints the effective configuration (YAML or JSON)
//! 2. `path`     - Prints where the configuration file is read from
//! 3. `set`      - Changes one value via a dot-notation key and saves the file
//! 4. `validate` - Parses the file and reports every invalid value

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use pawsync_core::config::Config;
use tracing::info;

use super::CliContext;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "auth.client_id")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Path => self.execute_path(ctx),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.is_json() {
            let json = serde_json::to_value(&ctx.config)
                .context("Failed to serialize configuration to JSON")?;
            fmt.print_json(&json);
            return Ok(());
        }

        fmt.success(&format!("Configuration ({})", ctx.config_path.display()));
        fmt.info("");
        for line in ctx.config.to_yaml()?.lines() {
            fmt.info(line);
        }
        Ok(())
    }

    fn execute_path(&self, ctx: &CliContext) -> Result<()> {
        if ctx.is_json() {
            ctx.formatter().print_json(&serde_json::json!({
                "config_path": ctx.config_path.display().to_string(),
                "exists": ctx.config_path.exists(),
            }));
        } else {
            println!("{}", ctx.config_path.display());
        }
        Ok(())
    }

    fn execute_set(&self, ctx: &CliContext, key: &str, value: &str) -> Result<()> {
        let fmt = ctx.formatter();
        let mut config = ctx.config.clone();

        if let Err(e) = apply_config_value(&mut config, key, value) {
            fmt.error(&format!("Failed to set '{key}': {e}"));
            fmt.info("Supported keys:");
            for key in SUPPORTED_KEYS {
                fmt.info(&format!("  {key}"));
            }
            return Ok(());
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            if ctx.is_json() {
                fmt.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "errors": messages,
                }));
            } else {
                fmt.error(&format!("Invalid value for '{key}': {}", messages.join("; ")));
            }
            return Ok(());
        }

        save_config(&config, &ctx.config_path)?;
        info!(key, "Configuration value updated");

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            fmt.success(&format!("Set {key}"));
            fmt.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let path = &ctx.config_path;

        if !path.exists() {
            if ctx.is_json() {
                fmt.print_json(&serde_json::json!({
                    "valid": true,
                    "config_path": path.display().to_string(),
                    "exists": false,
                    "errors": [],
                }));
            } else {
                fmt.info(&format!("Configuration file not found at {}", path.display()));
                fmt.info("Using default configuration.");
            }
            return Ok(());
        }

        let config = match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                if ctx.is_json() {
                    fmt.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": path.display().to_string(),
                        "errors": [format!("{e:#}")],
                    }));
                } else {
                    fmt.error(&format!("{e:#}"));
                }
                return Ok(());
            }
        };

        let errors = config.validate();
        if ctx.is_json() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            fmt.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": path.display().to_string(),
                "errors": messages,
            }));
        } else if errors.is_empty() {
            fmt.success("Configuration is valid");
            fmt.info(&format!("File: {}", path.display()));
        } else {
            fmt.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            for error in &errors {
                fmt.info(&format!("  {} - {}", error.field, error.message));
            }
        }
        Ok(())
    }
}

const SUPPORTED_KEYS: &[&str] = &[
    "auth.client_id",
    "auth.client_secret",
    "auth.redirect_port",
    "auth.expiry_buffer_secs",
    "auth.open_browser",
    "drive.folder_name",
    "drive.file_name",
    "drive.request_timeout_secs",
    "sync.status_display_ms",
    "storage.backend",
    "storage.data_dir",
    "logging.level",
];

/// Applies a dot-notation key/value pair; "none" or "" unsets optional values
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let optional = || (!value.is_empty() && value != "none").then(|| value.to_string());

    match key {
        "auth.client_id" => config.auth.client_id = optional(),
        "auth.client_secret" => config.auth.client_secret = optional(),
        "auth.redirect_port" => {
            config.auth.redirect_port = value
                .parse()
                .context("Expected a port number (0-65535)")?;
        }
        "auth.expiry_buffer_secs" => {
            config.auth.expiry_buffer_secs = value.parse().context("Expected an integer")?;
        }
        "auth.open_browser" => {
            config.auth.open_browser = value.parse().context("Expected true or false")?;
        }
        "drive.folder_name" => config.drive.folder_name = value.to_string(),
        "drive.file_name" => config.drive.file_name = value.to_string(),
        "drive.request_timeout_secs" => {
            config.drive.request_timeout_secs =
                value.parse().context("Expected a positive integer")?;
        }
        "sync.status_display_ms" => {
            config.sync.status_display_ms = value.parse().context("Expected a positive integer")?;
        }
        "storage.backend" => config.storage.backend = value.to_string(),
        "storage.data_dir" => config.storage.data_dir = PathBuf::from(value),
        "logging.level" => config.logging.level = value.to_string(),
        _ => anyhow::bail!("Unknown configuration key: '{}'", key),
    }
    Ok(())
}

fn save_config(config: &Config, path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    std::fs::write(path, config.to_yaml()?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_client_id() {
        let mut config = Config::default();
        apply_config_value(&mut config, "auth.client_id", "abc.apps.googleusercontent.com")
            .unwrap();
        assert_eq!(
            config.auth.client_id.as_deref(),
            Some("abc.apps.googleusercontent.com")
        );

        apply_config_value(&mut config, "auth.client_id", "none").unwrap();
        assert!(config.auth.client_id.is_none());
    }

    #[test]
    fn test_apply_numeric_values() {
        let mut config = Config::default();
        apply_config_value(&mut config, "auth.redirect_port", "9000").unwrap();
        apply_config_value(&mut config, "sync.status_display_ms", "500").unwrap();
        assert_eq!(config.auth.redirect_port, 9000);
        assert_eq!(config.sync.status_display_ms, 500);
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "auth.redirect_port", "99999").is_err());
        assert!(apply_config_value(&mut config, "auth.open_browser", "maybe").is_err());
        assert!(apply_config_value(&mut config, "nope.key", "1").is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = Config::default();
        apply_config_value(&mut config, "drive.folder_name", "Rex_Backup").unwrap();

        save_config(&config, &path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.drive.folder_name, "Rex_Backup");
    }
}
