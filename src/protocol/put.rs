use tracing::error;

use crate::protocol::{PutKeyArg, PutKeyRet};
use crate::store::{Store, StoreError};

/// Details returned when `PutKey` is called with an empty key
pub const EMPTY_KEY_DETAILS: &str = "Cannot send empty key to kvstore.";
/// Details returned when `PutKey` is called with an empty value
pub const EMPTY_VALUE_DETAILS: &str = "Cannot send empty value to kvstore.";

/// PutKey call: create or overwrite one key
#[derive(Debug, Clone, PartialEq)]
pub struct PutKeyCmd {
  pub key: String,
  pub value: String,
}

impl PutKeyCmd {
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
    }
  }

  /// Execute the PutKey command
  pub fn execute(self, store: &Store) -> PutKeyRet {
    match store.put(self.key, self.value) {
      Ok(_) => PutKeyRet::ok(),
      Err(StoreError::EmptyKey) => PutKeyRet::failure(EMPTY_KEY_DETAILS),
      Err(StoreError::EmptyValue) => PutKeyRet::failure(EMPTY_VALUE_DETAILS),
      Err(e) => {
        error!("PutKey failed: {}", e);
        PutKeyRet::failure(e.to_string())
      }
    }
  }
}

impl From<PutKeyArg> for PutKeyCmd {
  fn from(arg: PutKeyArg) -> Self {
    Self::new(arg.key, arg.value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_put_cmd_execute_success() {
    let store = Store::new();
    let result = PutKeyCmd::new("key", "value").execute(&store);

    assert_eq!(result, PutKeyRet::ok());
    assert_eq!(store.get("key").unwrap().value, "value");
  }

  #[test]
  fn test_put_cmd_execute_empty_key() {
    let store = Store::new();
    let result = PutKeyCmd::new("", "x").execute(&store);

    assert!(!result.success);
    assert_eq!(result.error_details(), Some("Cannot send empty key to kvstore."));
    assert_eq!(store.len(), 0);
  }

  #[test]
  fn test_put_cmd_execute_empty_value() {
    let store = Store::new();
    let result = PutKeyCmd::new("k", "").execute(&store);

    assert!(!result.success);
    assert_eq!(result.error_details(), Some("Cannot send empty value to kvstore."));
    assert_eq!(store.len(), 0);
  }

  #[test]
  fn test_put_cmd_from_arg() {
    let cmd = PutKeyCmd::from(PutKeyArg {
      key: "a".to_string(),
      value: "1".to_string(),
    });
    assert_eq!(cmd, PutKeyCmd::new("a", "1"));
  }

  #[test]
  fn test_put_cmd_internal_error_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&crate::config::StoreConfig {
      num_shards: 1,
      data_dir: Some(dir.path().to_path_buf()),
    })
    .unwrap();
    // A plain file where the shard directory should be makes record writes fail.
    std::fs::write(dir.path().join("0"), b"").unwrap();

    let result = PutKeyCmd::new("k", "v").execute(&store);

    assert!(!result.success);
    assert!(result.error_details().unwrap().contains("failed to write record"));
  }
}
