//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `stower.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::Local;
use serde::Deserialize;

use stower_protocol::mac::MacAddr;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// BLE discovery settings.
    pub scan: ScanConfig,
    /// File transfer settings.
    pub transfer: TransferConfig,
    /// Commissioning settings.
    pub commission: CommissionConfig,
    /// File-index persistence settings.
    pub index: IndexConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// BLE discovery configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// How long a scan listens for advertisements, in seconds.
    pub duration_secs: u64,
}

/// File transfer configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Longest wait for a single response chunk, in seconds.
    pub chunk_timeout_secs: u64,
    /// Bound on a whole listing drain, in seconds.
    pub list_timeout_secs: u64,
    /// File names never pulled or deleted, on top of the built-in ones.
    pub keep: Vec<String>,
    /// strftime pattern for the log file still being written today.
    pub today_pattern: String,
}

/// Commissioning configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CommissionConfig {
    /// Telemetry logging interval written during enrollment, in minutes.
    pub log_interval: u8,
    /// Default battery node addresses (`AA:BB:CC:DD:EE:FF`), used when the
    /// command line passes none.
    pub batteries: Vec<String>,
}

/// File-index persistence configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Path of the JSON index document.
    pub path: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `stower.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or a
    /// value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("stower.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("STOWER_INDEX_PATH") {
            self.index.path = val;
        }
        if let Ok(val) = std::env::var("STOWER_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.duration_secs == 0 {
            return Err(ConfigError::Validation(
                "scan.duration_secs must be non-zero".to_string(),
            ));
        }
        if self.transfer.chunk_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "transfer.chunk_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.transfer.list_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "transfer.list_timeout_secs must be non-zero".to_string(),
            ));
        }
        let mut rendered = String::new();
        if write!(
            &mut rendered,
            "{}",
            Local::now().format(&self.transfer.today_pattern)
        )
        .is_err()
        {
            return Err(ConfigError::Validation(
                "transfer.today_pattern is not a valid strftime pattern".to_string(),
            ));
        }
        Ok(())
    }

    /// How long a scan listens for advertisements.
    #[must_use]
    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan.duration_secs)
    }

    /// Transfer timeouts in the form the core expects.
    #[must_use]
    pub fn transfer_config(&self) -> stower_core::TransferConfig {
        stower_core::TransferConfig {
            chunk_timeout: Duration::from_secs(self.transfer.chunk_timeout_secs),
            list_timeout: Duration::from_secs(self.transfer.list_timeout_secs),
        }
    }

    /// Names excluded from pull and delete: the configured keeps plus
    /// today's live log, rendered from `today_pattern` with the local date.
    #[must_use]
    pub fn reserved_names(&self) -> Vec<String> {
        let mut reserved = self.transfer.keep.clone();
        let mut today = String::new();
        if write!(
            &mut today,
            "{}",
            Local::now().format(&self.transfer.today_pattern)
        )
        .is_ok()
        {
            reserved.push(today);
        }
        reserved
    }

    /// Battery node addresses parsed from the commissioning section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when an address is malformed.
    pub fn battery_addrs(&self) -> Result<Vec<MacAddr>, ConfigError> {
        self.commission
            .batteries
            .iter()
            .map(|raw| {
                raw.parse().map_err(|_| {
                    ConfigError::Validation(format!("invalid battery address {raw:?}"))
                })
            })
            .collect()
    }

    /// Path of the JSON index document.
    #[must_use]
    pub fn index_path(&self) -> &str {
        &self.index.path
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { duration_secs: 10 }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_timeout_secs: 10,
            list_timeout_secs: 30,
            keep: Vec::new(),
            today_pattern: "%Y-%m-%d.log".to_string(),
        }
    }
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            log_interval: 15,
            batteries: Vec::new(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: "stower-index.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "stowerctl=info,stower=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
