use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{CacheOptions, ResponseOrdering, RetryPolicy};

const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Custom title for the header (defaults to "PCDB")
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_api_url")]
  pub url: String,
  /// Per-request timeout. Unset means no timeout.
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      timeout_secs: None,
    }
  }
}

fn default_api_url() -> String {
  DEFAULT_API_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Extra attempts after a failed fetch (0 = fail on first error)
  #[serde(default)]
  pub retries: u32,
  #[serde(default = "default_retry_backoff_ms")]
  pub retry_backoff_ms: u64,
  /// Refetch successful data older than this when it is observed
  pub stale_time_secs: Option<u64>,
  /// `last_issued` (default) or `last_completed`
  #[serde(default)]
  pub ordering: ResponseOrdering,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      retries: 0,
      retry_backoff_ms: default_retry_backoff_ms(),
      stale_time_secs: None,
      ordering: ResponseOrdering::default(),
    }
  }
}

fn default_retry_backoff_ms() -> u64 {
  500
}

impl From<&CacheConfig> for CacheOptions {
  fn from(config: &CacheConfig) -> Self {
    CacheOptions {
      retry: RetryPolicy {
        retries: config.retries,
        backoff: Duration::from_millis(config.retry_backoff_ms),
      },
      stale_time: config.stale_time_secs.map(Duration::from_secs),
      ordering: config.ordering,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pcdb.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pcdb/config.yaml
  ///
  /// Without a file the defaults apply.
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("pcdb.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pcdb").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("PCDB")
  }
}
