//! Configuration management for Cliplink.
//!
//! This module handles loading, saving, and managing Cliplink configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/cliplink/config.toml` |
//! | macOS | `~/Library/Application Support/dev.Cliplink.Cliplink/config.toml` |
//! | Windows | `%APPDATA%\Cliplink\Cliplink\config\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use cliplink_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Device name: {}", config.general.device_name);
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration struct for Cliplink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Network settings
    pub network: NetworkConfig,
    /// Sync settings
    pub sync: SyncConfig,
    /// UI settings
    pub ui: UiConfig,
}

/// General configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Display name announced to peers
    pub device_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            device_name: hostname::get()
                .ok()
                .map(|h| h.to_string_lossy().to_string())
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| "Cliplink".to_string()),
        }
    }
}

/// Network configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP listen port (0 picks an ephemeral port)
    pub port: u16,
    /// Advertise and browse via mDNS
    pub mdns: bool,
    /// Peers dialed directly at startup
    pub peers: Vec<SocketAddr>,
    /// Timeout for dialing a peer
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Timeout for delivering one message to one peer
    #[serde(with = "humantime_serde")]
    pub send_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            mdns: true,
            peers: Vec::new(),
            connect_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(5),
        }
    }
}

/// Sync configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How often the clipboard is polled
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Whether sync is on when the process starts
    pub start_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(crate::DEFAULT_POLL_INTERVAL_MS),
            start_enabled: true,
        }
    }
}

/// UI configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Number of history entries kept
    pub history_capacity: usize,
    /// Color theme ("dark" or "light")
    pub theme: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            history_capacity: crate::DEFAULT_HISTORY_CAPACITY,
            theme: "dark".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// Creates the configuration directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Check values that would make the sync loop misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.sync.poll_interval.is_zero() {
            return Err(Error::InvalidConfig {
                key: "sync.poll_interval".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.ui.history_capacity == 0 {
            return Err(Error::InvalidConfig {
                key: "ui.history_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.network.send_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                key: "network.send_timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "Cliplink", "Cliplink")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

/// Parse a human duration such as `500ms`, `5s` or `2m`.
///
/// # Errors
///
/// Returns an error message if the suffix or number is invalid.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let parse = |n: &str| n.trim().parse::<u64>().map_err(|e| format!("{e}"));

    if let Some(ms) = s.strip_suffix("ms") {
        parse(ms).map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        parse(secs).map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        parse(mins).map(|m| Duration::from_secs(m * 60))
    } else {
        Err(format!("invalid duration '{s}' (expected e.g. 500ms, 5s, 2m)"))
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.network.port, crate::DEFAULT_PORT);
        assert!(config.network.mdns);
        assert!(config.sync.start_enabled);
        assert_eq!(config.sync.poll_interval, Duration::from_millis(500));
        assert_eq!(config.ui.history_capacity, 50);
        assert!(!config.general.device_name.is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.general.device_name = "Test Device".to_string();
        original.network.port = 12345;
        original.network.peers = vec!["192.168.1.20:52700".parse().unwrap()];
        original.sync.poll_interval = Duration::from_millis(250);

        original.save_to(&config_path).expect("save");
        let loaded = Config::load_from(&config_path).expect("load");

        assert_eq!(loaded.general.device_name, "Test Device");
        assert_eq!(loaded.network.port, 12345);
        assert_eq!(loaded.network.peers, original.network.peers);
        assert_eq!(loaded.sync.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_config_deserialization_partial() {
        let partial_toml = r#"
[general]
device_name = "My Laptop"

[sync]
poll_interval = "1s"
"#;

        let config: Config = toml::from_str(partial_toml).expect("parse partial config");

        assert_eq!(config.general.device_name, "My Laptop");
        assert_eq!(config.sync.poll_interval, Duration::from_secs(1));
        assert_eq!(config.network.port, crate::DEFAULT_PORT);
        assert_eq!(config.ui.history_capacity, crate::DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.network.port, crate::DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[ui]\nhistory_capacity = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { ref key, .. } if key == "ui.history_capacity"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("xs").is_err());
    }

    #[test]
    fn test_duration_serialization() {
        let toml_str = toml::to_string_pretty(&Config::default()).expect("serialize");
        assert!(toml_str.contains("poll_interval = \"500ms\""));
        assert!(toml_str.contains("send_timeout = \"5s\""));
    }

    #[test]
    fn test_config_path() {
        assert!(Config::config_path().ends_with("config.toml"));
    }
}
