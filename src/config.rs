use color_eyre::{eyre::eyre, Result};
use reqwest::header::HeaderName;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::http::{RetryPolicy, DEFAULT_BATCH_SIZE};

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub retry: RetryConfig,
  pub batch: BatchConfig,
  pub csrf: CsrfConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// API root, e.g. "https://shop.example.com/api/"
  pub base_url: String,
  pub user_agent: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8000/api/".to_string(),
      user_agent: concat!("storefront/", env!("CARGO_PKG_VERSION")).to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { ttl_secs: 300 }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  pub max_retries: u32,
  pub base_delay_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_retries: 3,
      base_delay_ms: 1000,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
  pub size: usize,
}

impl Default for BatchConfig {
  fn default() -> Self {
    Self {
      size: DEFAULT_BATCH_SIZE,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
  pub cookie_name: String,
  pub header_name: String,
  pub poll_interval_secs: u64,
  /// Fallback token file (defaults to the user data directory)
  pub token_file: Option<PathBuf>,
}

impl Default for CsrfConfig {
  fn default() -> Self {
    Self {
      cookie_name: "XSRF-TOKEN".to_string(),
      header_name: "X-CSRF-Token".to_string(),
      poll_interval_secs: 30,
      token_file: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Level for this crate when RUST_LOG is unset
  pub level: String,
  /// Daily-rolling log file prefix; logs go to stderr only when unset
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      file: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./storefront.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storefront/config.yaml
  ///
  /// Falls back to defaults when no file is found. `STOREFRONT_API_URL`
  /// overrides the configured base URL either way.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      config.api.base_url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("storefront.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storefront").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Parsed API base URL.
  pub fn base_url(&self) -> Result<Url> {
    Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url '{}': {}", self.api.base_url, e))
  }

  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache.ttl_secs)
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_retries: self.retry.max_retries,
      base_delay: Duration::from_millis(self.retry.base_delay_ms),
    }
  }

  pub fn csrf_header(&self) -> Result<HeaderName> {
    HeaderName::from_bytes(self.csrf.header_name.as_bytes())
      .map_err(|e| eyre!("Invalid csrf.header_name '{}': {}", self.csrf.header_name, e))
  }

  pub fn csrf_poll_interval(&self) -> Duration {
    Duration::from_secs(self.csrf.poll_interval_secs.max(1))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("storefront.yaml");
    fs::write(&path, contents).expect("Failed to write config");
    (temp_dir, path)
  }

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    assert_eq!(config.retry_policy(), RetryPolicy::default());
    assert_eq!(config.batch.size, 5);
    assert_eq!(config.csrf.cookie_name, "XSRF-TOKEN");
    assert_eq!(config.csrf_header().unwrap().as_str(), "x-csrf-token");
    assert_eq!(config.csrf_poll_interval(), Duration::from_secs(30));
  }

  #[test]
  fn test_partial_file_keeps_defaults() {
    let (_dir, path) = write_config(
      "api:\n  base_url: https://shop.example.com/api/\nretry:\n  max_retries: 1\n",
    );

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.api.base_url, "https://shop.example.com/api/");
    assert_eq!(config.retry.max_retries, 1);
    assert_eq!(config.retry.base_delay_ms, 1000);
    assert_eq!(config.cache.ttl_secs, 300);
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = Config::load(Some(&temp_dir.path().join("nope.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_invalid_yaml_is_error() {
    let (_dir, path) = write_config("cache: [not, a, map]\n");
    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
  }

  #[test]
  fn test_invalid_header_name() {
    let mut config = Config::default();
    config.csrf.header_name = "bad header".to_string();
    assert!(config.csrf_header().is_err());
  }

  #[test]
  fn test_invalid_base_url() {
    let mut config = Config::default();
    config.api.base_url = "not a url".to_string();
    assert!(config.base_url().is_err());
  }
}
