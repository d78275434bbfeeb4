use tracing::{error, info};

use crate::protocol::{GetKeyArg, GetKeyRet};
use crate::store::{Store, StoreError};

/// Details returned when `GetKey` is called with an empty key
pub const EMPTY_KEY_DETAILS: &str = "Cannot fetch empty key from kvstore";

/// GetKey call: look up the value and timestamp of one key
#[derive(Debug, Clone, PartialEq)]
pub struct GetKeyCmd {
  pub key: String,
}

impl GetKeyCmd {
  /// Create a new GetKey command
  pub fn new(key: impl Into<String>) -> Self {
    Self { key: key.into() }
  }

  /// Execute the GetKey command
  pub fn execute(&self, store: &Store) -> GetKeyRet {
    match store.get(&self.key) {
      Ok(record) => GetKeyRet::found(
        record.value,
        i64::try_from(record.last_modified_ts).unwrap_or(i64::MAX),
      ),
      Err(StoreError::EmptyKey) => GetKeyRet::failure(EMPTY_KEY_DETAILS),
      Err(e @ StoreError::NotFound(_)) => {
        info!("GetKey miss: {}", e);
        GetKeyRet::failure(e.to_string())
      }
      Err(e) => {
        error!("GetKey failed for key {}: {}", self.key, e);
        GetKeyRet::failure(e.to_string())
      }
    }
  }
}

impl From<GetKeyArg> for GetKeyCmd {
  fn from(arg: GetKeyArg) -> Self {
    Self::new(arg.key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_get_cmd_struct_creation() {
    let cmd = GetKeyCmd::from(GetKeyArg {
      key: "mykey".to_string(),
    });
    assert_eq!(cmd.key, "mykey");
  }

  #[test]
  fn test_get_cmd_execute() {
    let store = Store::new();
    let ts = store.put("foo".to_string(), "bar".to_string()).unwrap();

    let result = GetKeyCmd::new("foo").execute(&store);

    assert!(result.success);
    assert_eq!(result.value, "bar");
    assert_eq!(result.db_modified_ts, ts as i64);
    assert!(result.kv_error.is_none());
  }

  #[test]
  fn test_get_cmd_execute_empty_key() {
    let store = Store::new();
    let result = GetKeyCmd::new("").execute(&store);

    assert!(!result.success);
    assert_eq!(
      result.error_details(),
      Some("Cannot fetch empty key from kvstore")
    );
  }

  #[test]
  fn test_get_cmd_execute_not_found() {
    let store = Store::new();
    let result = GetKeyCmd::new("missing_key").execute(&store);

    assert!(!result.success);
    assert!(result.value.is_empty());
    assert_eq!(
      result.error_details(),
      Some("Key not found in kvstore: missing_key")
    );
  }
}
