//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SCANIUM_API_URL=https://api.scanium.app                            │
//! │     SCANIUM_SYNC_INTERVAL_SECS=900                                     │
//! │     SCANIUM_PULL_PAGE_SIZE=100                                         │
//! │     SCANIUM_DB_PATH=/data/scanium.db                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/scanium/sync.toml (Linux)                                │
//! │     ~/Library/Application Support/com.scanium.app/sync.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [remote]
//! base_url = "https://api.scanium.app"
//! request_timeout_secs = 30
//! connect_timeout_secs = 10
//!
//! [sync]
//! pull_page_size = 100
//!
//! [scheduler]
//! job_name = "scanium-item-sync"
//! interval_secs = 900
//! initial_backoff_secs = 30
//! max_backoff_secs = 3600
//!
//! [database]
//! path = "/data/scanium.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use scanium_core::DEFAULT_PULL_PAGE_SIZE;
use scanium_db::DbConfig;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Remote Settings
// =============================================================================

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL of the item API (without the `/v1` prefix).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout (seconds). The engine itself sets no timeouts.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.scanium.app".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl RemoteSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Remote items requested per pull (one page per cycle).
    #[serde(default = "default_pull_page_size")]
    pub pull_page_size: u32,
}

fn default_pull_page_size() -> u32 {
    DEFAULT_PULL_PAGE_SIZE
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            pull_page_size: default_pull_page_size(),
        }
    }
}

// =============================================================================
// Scheduler Settings
// =============================================================================

/// Periodic job settings.
///
/// ## Retry Timing
/// ```text
/// Success / Failure ──► wait interval_secs
/// Retry             ──► wait backoff: initial, ×2, ×4 ... capped at max
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Name of the unique periodic job.
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// Period between regular firings (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// First retry delay after a transient failure (seconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,

    /// Upper bound on the retry delay (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_job_name() -> String {
    "scanium-item-sync".to_string()
}

fn default_interval() -> u64 {
    15 * 60
}

fn default_initial_backoff() -> u64 {
    30
}

fn default_max_backoff() -> u64 {
    60 * 60
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings {
            job_name: default_job_name(),
            interval_secs: default_interval(),
            initial_backoff_secs: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl SchedulerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Local database location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseSettings {
    /// Resolves the database file path.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            directories::ProjectDirs::from("com", "scanium", "app")
                .map(|dirs| dirs.data_dir().join("scanium.db"))
        })
    }

    /// Builds the pool configuration for the resolved path.
    pub fn db_config(&self) -> SyncResult<DbConfig> {
        self.resolved_path()
            .map(DbConfig::new)
            .ok_or_else(|| SyncError::InvalidConfig("No database path available".into()))
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Backend connection settings.
    #[serde(default)]
    pub remote: RemoteSettings,

    /// Sync cycle settings.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Periodic job settings.
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Local database settings.
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl SyncConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = Url::parse(&self.remote.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.remote.base_url
            )));
        }

        if self.sync.pull_page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "pull_page_size must be greater than 0".into(),
            ));
        }

        if self.scheduler.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }

        if self.scheduler.job_name.trim().is_empty() {
            return Err(SyncError::InvalidConfig("job_name must not be empty".into()));
        }

        if self.scheduler.initial_backoff_secs > self.scheduler.max_backoff_secs {
            return Err(SyncError::InvalidConfig(
                "initial_backoff_secs must not exceed max_backoff_secs".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the process environment in
    /// production).
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SCANIUM_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.remote.base_url = url;
        }

        if let Some(interval) = lookup("SCANIUM_SYNC_INTERVAL_SECS") {
            match interval.parse::<u64>() {
                Ok(secs) => self.scheduler.interval_secs = secs,
                Err(_) => warn!(value = %interval, "Ignoring invalid SCANIUM_SYNC_INTERVAL_SECS"),
            }
        }

        if let Some(size) = lookup("SCANIUM_PULL_PAGE_SIZE") {
            match size.parse::<u32>() {
                Ok(n) => self.sync.pull_page_size = n,
                Err(_) => warn!(value = %size, "Ignoring invalid SCANIUM_PULL_PAGE_SIZE"),
            }
        }

        if let Some(path) = lookup("SCANIUM_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "scanium", "app")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }
}
