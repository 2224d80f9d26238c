//! Configuration loading and typed config structures for the Turnstile
//! server.
//!
//! The configuration lives in `turnstile.yaml` in the working directory, or
//! wherever `TURNSTILE_CONFIG` points. Every field has a default, so a
//! missing file or a partial file is valid. Environment variables override
//! the file:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `DATABASE_URL` | `database.url` |
//! | `TURNSTILE_HOST` | `server.host` |
//! | `TURNSTILE_PORT` | `server.port` |
//! | `TURNSTILE_LOCKING` | `engine.locking` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;
use turnstile_db::StoreConfig;
use turnstile_engine::{EngineConfig, LockingMode};

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "turnstile.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value `{value}` for {var}: {reason}")]
    InvalidEnv {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration. Mirrors the structure of
/// `turnstile.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TurnstileConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Store connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Reservation engine settings.
    #[serde(default)]
    pub engine: EngineSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TurnstileConfig {
    /// Load configuration the way the binary does: read the file named by
    /// `TURNSTILE_CONFIG` (or `turnstile.yaml`), fall back to defaults if it
    /// does not exist, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed, or if an override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("TURNSTILE_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a YAML file at the given path. No
    /// environment overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a port or locking mode does
    /// not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a port or locking mode does
    /// not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(host) = lookup("TURNSTILE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TURNSTILE_PORT") {
            self.server.port = port.parse().map_err(|e: core::num::ParseIntError| {
                ConfigError::InvalidEnv {
                    var: "TURNSTILE_PORT",
                    reason: e.to_string(),
                    value: port,
                }
            })?;
        }
        if let Some(locking) = lookup("TURNSTILE_LOCKING") {
            self.engine.locking =
                locking
                    .parse()
                    .map_err(|reason: String| ConfigError::InvalidEnv {
                        var: "TURNSTILE_LOCKING",
                        value: locking,
                        reason,
                    })?;
        }
        Ok(())
    }

    /// Store settings derived from the `database` section.
    pub fn store_config(&self) -> StoreConfig {
        let db = &self.database;
        StoreConfig::new(&db.url)
            .with_max_connections(db.max_connections)
            .with_acquire_timeout(Duration::from_millis(db.acquire_timeout_ms))
            .with_idle_timeout(Duration::from_secs(db.idle_timeout_secs))
            .with_lock_timeout(Duration::from_millis(db.lock_timeout_ms))
    }

    /// Engine settings derived from the `engine` section.
    pub const fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            locking: self.engine.locking,
            transaction_timeout: Duration::from_millis(self.engine.transaction_timeout_ms),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Store connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; the scheme selects the backend.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long to wait for a pooled connection, in milliseconds.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// How long an idle connection is kept, in seconds.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Bound on any single lock wait inside the store, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Apply pending migrations at startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            lock_timeout_ms: default_lock_timeout_ms(),
            run_migrations: true,
        }
    }
}

/// Reservation engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineSection {
    /// `auto`, `skip_locked` or `serialized`.
    #[serde(default)]
    pub locking: LockingMode,

    /// Upper bound on one reservation, in milliseconds.
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            locking: LockingMode::Auto,
            transaction_timeout_ms: default_transaction_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    String::from("sqlite://turnstile.db")
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_acquire_timeout_ms() -> u64 {
    5_000
}

const fn default_idle_timeout_secs() -> u64 {
    300
}

const fn default_lock_timeout_ms() -> u64 {
    5_000
}

const fn default_true() -> bool {
    true
}

const fn default_transaction_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    String::from("info")
}
