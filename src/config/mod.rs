use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::store::DEFAULT_SHARDS;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config file '{path}': {source}")]
  Read {
    path: String,
    source: std::io::Error,
  },

  #[error("Failed to parse config file '{path}': {source}")]
  Parse {
    path: String,
    source: toml::de::Error,
  },

  #[error("invalid server_addr '{addr}': {source}")]
  ServerAddr {
    addr: String,
    source: std::net::AddrParseError,
  },

  #[error("store.num_shards must be at least 1")]
  NoShards,
}

/// Log configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
  /// Log file path, if not set, logs will be printed to stdout
  pub file: Option<String>,
  /// Log level, default is "info"
  #[serde(default = "default_log_level")]
  pub level: String,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      file: None,
      level: default_log_level(),
    }
  }
}

/// Store engine configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
  /// Number of lock-guarded shards the key space is split into
  #[serde(default = "default_num_shards")]
  pub num_shards: usize,
  /// Directory for durable records; the store is in-memory only when unset
  pub data_dir: Option<PathBuf>,
}

fn default_num_shards() -> usize {
  DEFAULT_SHARDS
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      num_shards: default_num_shards(),
      data_dir: None,
    }
  }
}

/// KvStore server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
  /// gRPC listening address
  #[serde(default = "default_server_addr")]
  pub server_addr: String,

  /// Log configuration
  #[serde(default)]
  pub log: LogConfig,

  /// Store configuration
  #[serde(default)]
  pub store: StoreConfig,
}

fn default_server_addr() -> String {
  "0.0.0.0:50052".to_string()
}

impl Default for Config {
  fn default() -> Self {
    Self {
      server_addr: default_server_addr(),
      log: LogConfig::default(),
      store: StoreConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from TOML file
  pub fn from_file(path: &str) -> Result<Self, ConfigError> {
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_string(),
      source,
    })?;

    let config: Config = toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
      path: path.to_string(),
      source,
    })?;

    config.validate()?;
    Ok(config)
  }

  /// Check values that serde cannot
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.socket_addr()?;
    if self.store.num_shards == 0 {
      return Err(ConfigError::NoShards);
    }
    Ok(())
  }

  /// Parsed listening address
  pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
    self
      .server_addr
      .parse()
      .map_err(|source| ConfigError::ServerAddr {
        addr: self.server_addr.clone(),
        source,
      })
  }
}
