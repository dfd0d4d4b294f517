//! Configuration file handling with TOML support.

use crate::api::DEFAULT_API_URL;
use crate::listing::DEFAULT_PAGE_SIZE;
use crate::models::{SortDirection, SortKey};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the price-tracker API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_timeout() -> u64 {
    10
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Listings per page; 0 shows one unpaginated table
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Currency marker for prices and chart ticks
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Default sort field
    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    /// Sort in descending order
    #[serde(default)]
    pub sort_descending: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            currency: default_currency(),
            sort_by: default_sort_by(),
            sort_descending: false,
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_currency() -> String {
    "NT$".to_string()
}
fn default_sort_by() -> String {
    "latest_price".to_string()
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// File to append logs to in interactive mode
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Default filter directive, overridden by RAMTOP_LOG
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DisplayConfig {
    /// Configured sort key, falling back to price for unknown names.
    pub fn sort_key(&self) -> SortKey {
        SortKey::from_field(&self.sort_by).unwrap_or_default()
    }

    pub fn sort_direction(&self) -> SortDirection {
        if self.sort_descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from default location or create default.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to load config: {:#}", e);
                    }
                }
            }
        }
        Config::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ramtop").join("config.toml"))
    }

    /// Write the commented sample configuration to `path`.
    ///
    /// Refuses to overwrite an existing file.
    pub fn write_sample(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, sample_config())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Generate a sample configuration file content.
pub fn sample_config() -> &'static str {
    r##"# ramtop configuration file
# A terminal dashboard for RAM prices

[api]
# Base URL of the price-tracker backend
base_url = "http://127.0.0.1:8000"
# Request timeout in seconds
timeout = 10

[display]
# Listings per page (0 = one unpaginated table)
page_size = 50
# Currency marker for prices and chart axis
currency = "NT$"
# Default sort field: brand, name, capacity, speed, latency, price, status, last_updated
sort_by = "price"
# Sort in descending order
sort_descending = false

[logging]
# Log file used in interactive mode (logs go to stderr in batch mode)
# file = "/tmp/ramtop.log"
# Filter directive; RAMTOP_LOG overrides it
level = "info"
"##
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.timeout, 10);
        assert_eq!(config.display.page_size, 50);
        assert_eq!(config.display.sort_key(), SortKey::Price);
        assert_eq!(config.display.sort_direction(), SortDirection::Ascending);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(sample_config()).unwrap();
        assert_eq!(config.display.currency, "NT$");
        assert_eq!(config.display.sort_key(), SortKey::Price);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [display]
            sort_by = "brand"
            sort_descending = true
            "#,
        )
        .unwrap();
        assert_eq!(config.api.timeout, 10);
        assert_eq!(config.display.page_size, 50);
        assert_eq!(config.display.sort_key(), SortKey::Brand);
        assert_eq!(config.display.sort_direction(), SortDirection::Descending);
    }

    #[test]
    fn test_unknown_sort_field_falls_back_to_price() {
        let display = DisplayConfig {
            sort_by: "volume".to_string(),
            ..DisplayConfig::default()
        };
        assert_eq!(display.sort_key(), SortKey::Price);
    }

    #[test]
    fn test_write_sample_then_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ramtop").join("config.toml");

        Config::write_sample(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.api.base_url, "http://127.0.0.1:8000");
        assert!(Config::write_sample(&path).is_err());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = Config::load(Path::new("/nonexistent/ramtop.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
