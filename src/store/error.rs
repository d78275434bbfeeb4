use std::path::PathBuf;

use crate::encoding::DecodeError;

/// Errors returned by the store engine
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// Key argument is the empty string
  #[error("empty key")]
  EmptyKey,

  /// Value argument is the empty string
  #[error("empty value")]
  EmptyValue,

  /// No record exists for the key
  #[error("Key not found in kvstore: {0}")]
  NotFound(String),

  /// A writer panicked while holding the shard lock
  #[error("shard {0} lock poisoned")]
  Poisoned(usize),

  #[error("failed to open data directory {}: {source}", path.display())]
  Open {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("Failed to persist oracle timestamp for shard: {shard}: {source}")]
  Oracle {
    shard: usize,
    source: std::io::Error,
  },

  #[error("failed to write record to {}: {source}", path.display())]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error(transparent)]
  Encode(#[from] DecodeError),
}
