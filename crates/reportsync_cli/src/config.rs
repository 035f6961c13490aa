//! Configuration file support for reportsync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `REPORTSYNC_`, sections separated
//!    by `__`, e.g. `REPORTSYNC_DATABASE__URL`, `REPORTSYNC_API__BASE_URL`)
//! 3. Config file (./reportsync.toml, then ~/.config/reportsync/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/reportsync/reports.db`
//! on Linux (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite:///var/lib/reportsync/reports.db?mode=rwc"
//!
//! [api]
//! base_url = "https://openapi.example.com"
//! timeout_secs = 30
//! requests_per_second = 5
//!
//! [sync]
//! pacing = "fixed"        # fixed | token_bucket | none
//! pacing_ms = 500
//! page_size_cap = 200
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use reportsync::rate_limits;
use reportsync::sync::{DEFAULT_PACING_MS, PacingConfig, PacingStrategy};
use serde::Deserialize;

const APP_NAME: &str = "reportsync";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub sync: SyncConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// Upstream reporting API.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every task path is appended to.
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Token bucket applied in front of the HTTP client.
    pub requests_per_second: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            requests_per_second: rate_limits::DEFAULT_RPS,
        }
    }
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pause strategy between pages, periods and dimensions.
    pub pacing: PacingStrategy,
    /// Delay for the fixed pacing strategy.
    pub pacing_ms: u64,
    /// Lower every task's page size to at most this many records.
    pub page_size_cap: Option<u32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pacing: PacingStrategy::Fixed,
            pacing_ms: DEFAULT_PACING_MS,
            page_size_cap: None,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/reportsync/config.toml)
    /// 3. Local config file (./reportsync.toml)
    /// 4. Environment variables with REPORTSYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("reportsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./reportsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // REPORTSYNC_API__BASE_URL -> api.base_url
        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix("REPORTSYNC")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("reports.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs.max(1))
    }

    /// Pacing settings, with optional overrides from the command line.
    pub fn pacing(&self, strategy: Option<PacingStrategy>, delay_ms: Option<u64>) -> PacingConfig {
        PacingConfig {
            strategy: strategy.unwrap_or(self.sync.pacing),
            delay: Duration::from_millis(delay_ms.unwrap_or(self.sync.pacing_ms)),
            requests_per_second: self.api.requests_per_second,
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/reportsync` or `~/.local/state/reportsync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
