mod config;
mod encoding;
mod protocol;
mod server;
mod store;
mod util;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use config::{Config, LogConfig};
use server::Server;
use tracing::info;

/// Key-value store served over gRPC
#[derive(Parser, Debug)]
#[command(name = "kvstore", version)]
struct Args {
  /// Path to a TOML config file
  #[arg(short, long)]
  config: Option<String>,

  /// Listening address, overrides `server_addr`
  #[arg(long)]
  addr: Option<String>,

  /// Number of store shards, overrides `store.num_shards`
  #[arg(long)]
  shards: Option<usize>,

  /// Data directory for durable records, overrides `store.data_dir`
  #[arg(long)]
  data_dir: Option<PathBuf>,

  /// Log level, overrides `log.level`
  #[arg(long)]
  log_level: Option<String>,
}

impl Args {
  fn into_config(self) -> anyhow::Result<Config> {
    let mut config = match &self.config {
      Some(path) => Config::from_file(path)?,
      None => Config::default(),
    };
    if let Some(addr) = self.addr {
      config.server_addr = addr;
    }
    if let Some(shards) = self.shards {
      config.store.num_shards = shards;
    }
    if let Some(dir) = self.data_dir {
      config.store.data_dir = Some(dir);
    }
    if let Some(level) = self.log_level {
      config.log.level = level;
    }
    config.validate()?;
    Ok(config)
  }
}

fn init_logging(log: &LogConfig) -> anyhow::Result<()> {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log.level));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_thread_ids(true);

  match &log.file {
    Some(path) => {
      let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{}'", path))?;
      builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    }
    None => builder.init(),
  }
  Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = Args::parse().into_config()?;
  init_logging(&config.log)?;

  info!("Starting KvStore - gRPC key-value store");
  info!("Version: {}", env!("CARGO_PKG_VERSION"));

  let server = Server::start(&config).await?;
  info!("Server listening on: {}", server.local_addr());

  server
    .run_until(async {
      match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
      }
    })
    .await?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cli_defaults() {
    let config = Args::parse_from(["kvstore"]).into_config().unwrap();
    assert_eq!(config.server_addr, "0.0.0.0:50052");
    assert_eq!(config.store.num_shards, store::DEFAULT_SHARDS);
  }

  #[test]
  fn test_cli_overrides() {
    let config = Args::parse_from([
      "kvstore",
      "--addr",
      "127.0.0.1:7000",
      "--shards",
      "3",
      "--data-dir",
      "/tmp/kv",
      "--log-level",
      "debug",
    ])
    .into_config()
    .unwrap();
    assert_eq!(config.server_addr, "127.0.0.1:7000");
    assert_eq!(config.store.num_shards, 3);
    assert_eq!(config.store.data_dir, Some(PathBuf::from("/tmp/kv")));
    assert_eq!(config.log.level, "debug");
  }

  #[test]
  fn test_cli_rejects_zero_shards() {
    let result = Args::parse_from(["kvstore", "--shards", "0"]).into_config();
    assert!(result.is_err());
  }
}
