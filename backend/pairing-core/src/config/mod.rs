//! Relay and timing configuration for the pairing clients.
//!
//! Stored as `pairing.toml` in the application config directory. Every field
//! has a default so a missing or partial file still yields a usable config.
//! Durations are written in humantime form (`"5s"`, `"200ms"`).

mod duration_str;

use crate::error::config::ConfigError;
use crate::{PAIRING_RELAY_HOSTNAME, PAIRING_RELAY_PATH, PAIRING_RELAY_PORT};

use common::ErrorLocation;

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use const_format::concatcp;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

const CONFIG_FILE_NAME: &str = "pairing.toml";
const CONFIG_DIR_NAME: &str = "pairing-agent";
const CONFIG_VERSION: u32 = 1;

const DEFAULT_RELAY_URL: &str = concatcp!(
    "ws://",
    PAIRING_RELAY_HOSTNAME,
    ":",
    PAIRING_RELAY_PORT,
    PAIRING_RELAY_PATH
);

pub const ENV_RELAY_URL: &str = "PAIRING_RELAY_URL";
pub const ENV_KEEPALIVE_INTERVAL: &str = "PAIRING_KEEPALIVE_INTERVAL";
pub const ENV_MAX_MISSED_PONGS: &str = "PAIRING_MAX_MISSED_PONGS";
pub const ENV_SIGNATURE_TIMEOUT: &str = "PAIRING_SIGNATURE_TIMEOUT";
pub const ENV_RECONNECT_DELAY: &str = "PAIRING_RECONNECT_DELAY";

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_url")]
    pub url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// Period between origin pings.
    #[serde(default = "default_keepalive_interval", with = "duration_str")]
    pub interval: Duration,

    /// Unanswered pings tolerated before the channel is failed.
    #[serde(default = "default_max_missed_pongs")]
    pub max_missed_pongs: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval: default_keepalive_interval(),
            max_missed_pongs: default_max_missed_pongs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Upper bound for a signature round trip.
    #[serde(default = "default_signature_timeout", with = "duration_str")]
    pub signature: Duration,

    /// Upper bound for the relay to hand out a pairing code.
    #[serde(default = "default_pairing_code_timeout", with = "duration_str")]
    pub pairing_code: Duration,

    /// Fixed delay between tearing a channel down and reopening it.
    #[serde(default = "default_reconnect_delay", with = "duration_str")]
    pub reconnect_delay: Duration,

    /// Total time spent retrying a failed socket open.
    #[serde(default = "default_connect_retry", with = "duration_str")]
    pub connect_retry: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            signature: default_signature_timeout(),
            pairing_code: default_pairing_code_timeout(),
            reconnect_delay: default_reconnect_delay(),
            connect_retry: default_connect_retry(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub keepalive: KeepaliveConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            relay: RelayConfig::default(),
            keepalive: KeepaliveConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}
fn default_keepalive_interval() -> Duration {
    Duration::from_secs(5)
}
fn default_max_missed_pongs() -> u32 {
    5
}
fn default_signature_timeout() -> Duration {
    Duration::from_secs(120)
}
fn default_pairing_code_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_reconnect_delay() -> Duration {
    Duration::from_millis(200)
}
fn default_connect_retry() -> Duration {
    Duration::from_secs(10)
}

// ============================================
// IMPLEMENTATION
// ============================================

impl PairingConfig {
    /// Default config directory (`{platform config dir}/pairing-agent`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DirectoryNotFound`] when the platform exposes no config dir.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or_else(|| ConfigError::DirectoryNotFound {
                location: ErrorLocation::caller(),
            })
    }

    /// Load config from {config_dir}/pairing.toml.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is corrupted or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {e}");
            ConfigError::ReadError {
                location: ErrorLocation::caller(),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: PairingConfig = toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config TOML: {e}");
            ConfigError::ParseError {
                location: ErrorLocation::caller(),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/pairing.toml using a temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, serialization, write or rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::caller(),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, contents).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Apply `PAIRING_*` environment overrides on top of the loaded values.
    ///
    /// Durations accept humantime syntax (`"2s"`, `"150ms"`). The result is
    /// validated again.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = read_env(ENV_RELAY_URL) {
            debug!("Relay URL overridden from {ENV_RELAY_URL}");
            self.relay.url = url;
        }
        if let Some(interval) = read_env_duration(ENV_KEEPALIVE_INTERVAL)? {
            self.keepalive.interval = interval;
        }
        if let Some(raw) = read_env(ENV_MAX_MISSED_PONGS) {
            self.keepalive.max_missed_pongs =
                raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::EnvError {
                    location: ErrorLocation::caller(),
                    variable: ENV_MAX_MISSED_PONGS.to_string(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(timeout) = read_env_duration(ENV_SIGNATURE_TIMEOUT)? {
            self.timeouts.signature = timeout;
        }
        if let Some(delay) = read_env_duration(ENV_RECONNECT_DELAY)? {
            self.timeouts.reconnect_delay = delay;
        }

        self.validate()
    }

    /// Parsed relay URL.
    pub fn relay_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.relay.url).map_err(|e| ConfigError::ValidationError {
            location: ErrorLocation::caller(),
            reason: format!("Invalid relay URL '{}': {e}", self.relay.url),
        })
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::caller(),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        let url = self.relay_url()?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::caller(),
                reason: format!("Relay URL must use ws:// or wss://, got {}", self.relay.url),
            });
        }

        if self.keepalive.interval.is_zero() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::caller(),
                reason: "keepalive.interval must be greater than zero".to_string(),
            });
        }

        if self.keepalive.max_missed_pongs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::caller(),
                reason: "keepalive.max_missed_pongs must be at least 1".to_string(),
            });
        }

        if self.timeouts.signature.is_zero() || self.timeouts.pairing_code.is_zero() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::caller(),
                reason: "timeouts.signature and timeouts.pairing_code must be greater than zero"
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn read_env(variable: &str) -> Option<String> {
    env::var(variable).ok().filter(|value| !value.trim().is_empty())
}

#[track_caller]
fn read_env_duration(variable: &str) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = read_env(variable) else {
        return Ok(None);
    };

    humantime::parse_duration(raw.trim())
        .map(Some)
        .map_err(|e| ConfigError::EnvError {
            location: ErrorLocation::caller(),
            variable: variable.to_string(),
            reason: e.to_string(),
        })
}
