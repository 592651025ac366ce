//! Configuration module for PawSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::credential::DEFAULT_EXPIRY_BUFFER_SECS;

/// Default Google Drive v3 metadata endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Default Google Drive v3 media upload endpoint.
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for PawSync.
///
/// Every section falls back to its defaults when missing from the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub drive: DriveConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Google OAuth client ID. `None` until the user sets one.
    pub client_id: Option<String>,
    /// Client secret, required by Google for "Desktop app" clients.
    pub client_secret: Option<String>,
    /// Loopback port that receives the OAuth redirect.
    pub redirect_port: u16,
    /// Seconds subtracted from every granted token lifetime.
    pub expiry_buffer_secs: i64,
    /// Open the consent page in the default browser automatically.
    pub open_browser: bool,
}

/// Remote storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Name of the folder holding the backup file.
    pub folder_name: String,
    /// Name of the backup file.
    pub file_name: String,
    pub api_base_url: String,
    pub upload_base_url: String,
    /// Overall HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Reconciler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Milliseconds a success or error status stays visible before reverting to idle.
    pub status_display_ms: u64,
}

/// Where session state and records are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Session state backend: `file` or `keyring`.
    pub backend: String,
    /// Directory for the record file and the file-backed session state.
    pub data_dir: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/pawsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("pawsync")
            .join("config.yaml")
    }

    /// Path of the local record file.
    pub fn records_path(&self) -> PathBuf {
        self.storage.data_dir.join("sessions.json")
    }

    /// Path of the file-backed session state.
    pub fn session_state_path(&self) -> PathBuf {
        self.storage.data_dir.join("session_state.json")
    }

    /// Serialize to YAML (used by `pawsync config show`).
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_port: 8400,
            expiry_buffer_secs: DEFAULT_EXPIRY_BUFFER_SECS,
            open_browser: true,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_name: "PawSync_Data".to_string(),
            file_name: "pawsync_sessions.csv".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            status_display_ms: 3000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("pawsync"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"drive.folder_name"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `storage.backend`.
const VALID_STORAGE_BACKENDS: &[&str] = &["file", "keyring"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. A missing
    /// `auth.client_id` is not an error here: it only blocks `auth connect`.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- auth ---
        if let Some(client_id) = &self.auth.client_id {
            if client_id.trim().is_empty() {
                errors.push(ValidationError {
                    field: "auth.client_id".into(),
                    message: "must not be empty when set".into(),
                });
            }
        }
        if self.auth.redirect_port == 0 {
            errors.push(ValidationError {
                field: "auth.redirect_port".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.auth.expiry_buffer_secs < 0 {
            errors.push(ValidationError {
                field: "auth.expiry_buffer_secs".into(),
                message: "must not be negative".into(),
            });
        }

        // --- drive ---
        for (field, value) in [
            ("drive.folder_name", &self.drive.folder_name),
            ("drive.file_name", &self.drive.file_name),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must not be empty".into(),
                });
            }
        }
        for (field, value) in [
            ("drive.api_base_url", &self.drive.api_base_url),
            ("drive.upload_base_url", &self.drive.upload_base_url),
        ] {
            if !value.starts_with("https://") && !value.starts_with("http://") {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("must be an http(s) URL, got '{value}'"),
                });
            }
        }
        if self.drive.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "drive.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- sync ---
        if self.sync.status_display_ms == 0 {
            errors.push(ValidationError {
                field: "sync.status_display_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- storage ---
        if !VALID_STORAGE_BACKENDS.contains(&self.storage.backend.as_str()) {
            errors.push(ValidationError {
                field: "storage.backend".into(),
                message: format!(
                    "invalid backend '{}'; valid options: {}",
                    self.storage.backend,
                    VALID_STORAGE_BACKENDS.join(", ")
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use pawsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .auth_client_id("1234.apps.googleusercontent.com")
///     .sync_status_display_ms(5000)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- auth ---

    pub fn auth_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(client_id.into());
        self
    }

    pub fn auth_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.client_secret = Some(secret.into());
        self
    }

    pub fn auth_redirect_port(mut self, port: u16) -> Self {
        self.config.auth.redirect_port = port;
        self
    }

    pub fn auth_expiry_buffer_secs(mut self, secs: i64) -> Self {
        self.config.auth.expiry_buffer_secs = secs;
        self
    }

    pub fn auth_open_browser(mut self, open: bool) -> Self {
        self.config.auth.open_browser = open;
        self
    }

    // --- drive ---

    pub fn drive_folder_name(mut self, name: impl Into<String>) -> Self {
        self.config.drive.folder_name = name.into();
        self
    }

    pub fn drive_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.drive.file_name = name.into();
        self
    }

    /// Point both Drive endpoints at one base URL (useful against a mock server).
    pub fn drive_base_urls(mut self, api: impl Into<String>, upload: impl Into<String>) -> Self {
        self.config.drive.api_base_url = api.into();
        self.config.drive.upload_base_url = upload.into();
        self
    }

    pub fn drive_request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.drive.request_timeout_secs = secs;
        self
    }

    // --- sync ---

    pub fn sync_status_display_ms(mut self, ms: u64) -> Self {
        self.config.sync.status_display_ms = ms;
        self
    }

    // --- storage ---

    pub fn storage_backend(mut self, backend: impl Into<String>) -> Self {
        self.config.storage.backend = backend.into();
        self
    }

    pub fn storage_data_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.data_dir = dir;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
