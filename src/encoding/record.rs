//! Record encoding/decoding for storage

use serde::{Deserialize, Serialize};

/// Persisted form of one record.
///
/// Version 1 documents carry no key; their key is the hex-encoded file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordValue {
  /// Format version
  pub version: u8,
  /// Key the record belongs to, empty in version 1 documents
  #[serde(default)]
  pub key: String,
  /// Stored payload
  pub value: String,
  /// Last modification time in milliseconds (Unix timestamp)
  pub db_modified_ts: u64,
}

impl RecordValue {
  /// Create a new RecordValue at the current format version
  pub fn new(key: impl Into<String>, value: impl Into<String>, db_modified_ts: u64) -> Self {
    Self {
      version: super::CURRENT_VERSION,
      key: key.into(),
      value: value.into(),
      db_modified_ts,
    }
  }

  /// Serialize to JSON bytes
  pub fn serialize(&self) -> Result<Vec<u8>, DecodeError> {
    serde_json::to_vec(self).map_err(DecodeError::Json)
  }

  /// Deserialize from JSON bytes, rejecting documents that break record
  /// invariants
  pub fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
    let record: RecordValue = serde_json::from_slice(bytes)?;
    if record.version > super::CURRENT_VERSION {
      return Err(DecodeError::UnsupportedVersion(record.version));
    }
    if record.value.is_empty() || record.db_modified_ts == 0 {
      return Err(DecodeError::InvalidData);
    }
    if record.version > 1 && record.key.is_empty() {
      return Err(DecodeError::InvalidData);
    }
    Ok(record)
  }
}

/// Errors that can occur during encoding or decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
  /// Input is not a valid JSON record document
  #[error("malformed record document: {0}")]
  Json(#[from] serde_json::Error),
  /// Written by a newer format version
  #[error("unsupported record format version {0}")]
  UnsupportedVersion(u8),
  /// Well-formed but holds an empty key, an empty value or a zero timestamp
  #[error("invalid data for decoding")]
  InvalidData,
}
