//! TOML-based engine configuration.
//!
//! Stored at `~/.config/sitrep/config.toml`. Every field has a serde
//! default so a partial file, or none at all, yields a working config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Scan loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Minutes between scheduled scans.
    #[serde(default = "default_interval_min")]
    pub interval_min: u32,
    /// Base URL of the CSV feed; a `t` cache-buster is appended per scan.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_min: default_interval_min(),
            feed_url: default_feed_url(),
        }
    }
}

/// Inference endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_endpoint")]
    pub endpoint: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_inference_endpoint(),
        }
    }
}

/// Notification preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_interval_min() -> u32 {
    15
}
fn default_feed_url() -> String {
    "https://rss.app/feeds/_tasfa3b5SrEoAe6T.csv".into()
}
fn default_inference_endpoint() -> String {
    "http://127.0.0.1:8799/invoke".into()
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Path of the config file, `~/.config/sitrep/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join("sitrep").join("config.toml"))
    }

    /// Load from disk; a missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Persist to disk, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".into(),
            message: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Validate and set the scan interval.
    pub fn set_interval_min(&mut self, minutes: u32) -> Result<(), ConfigError> {
        if minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scan.interval_min".into(),
                message: "must be at least 1".into(),
            });
        }
        self.scan.interval_min = minutes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.scan.interval_min, 15);
        assert!(config.notifications.enabled);
        assert!(config.scan.feed_url.starts_with("https://"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str("[scan]\ninterval_min = 5\n").unwrap();
        assert_eq!(config.scan.interval_min, 5);
        assert_eq!(config.scan.feed_url, default_feed_url());
        assert!(config.notifications.enabled);
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.set_interval_min(30).unwrap();
        config.notifications.enabled = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.scan.interval_min, 30);
        assert!(!loaded.notifications.enabled);
    }

    #[test]
    fn missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(loaded.scan.interval_min, 15);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = Config::default();
        assert!(config.set_interval_min(0).is_err());
    }
}
