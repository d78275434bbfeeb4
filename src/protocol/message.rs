//! Wire messages of `kvstore.KvStoreInterface`
//!
//! Field tags follow `proto/kv_store_interface.proto`.

/// Structured error carried by a failed response
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KvError {
  #[prost(string, tag = "1")]
  pub error_details: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetKeyArg {
  #[prost(string, tag = "1")]
  pub key: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetKeyRet {
  #[prost(bool, tag = "1")]
  pub success: bool,
  #[prost(string, tag = "2")]
  pub value: ::prost::alloc::string::String,
  /// Unix epoch milliseconds of the last successful write to the key
  #[prost(int64, tag = "3")]
  pub db_modified_ts: i64,
  #[prost(message, optional, tag = "4")]
  pub kv_error: ::core::option::Option<KvError>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutKeyArg {
  #[prost(string, tag = "1")]
  pub key: ::prost::alloc::string::String,
  #[prost(string, tag = "2")]
  pub value: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutKeyRet {
  #[prost(bool, tag = "1")]
  pub success: bool,
  #[prost(message, optional, tag = "2")]
  pub kv_error: ::core::option::Option<KvError>,
}

impl KvError {
  pub fn new(details: impl Into<String>) -> Self {
    Self {
      error_details: details.into(),
    }
  }
}

impl GetKeyRet {
  /// Successful lookup
  pub fn found(value: String, db_modified_ts: i64) -> Self {
    Self {
      success: true,
      value,
      db_modified_ts,
      kv_error: None,
    }
  }

  /// Failed lookup; payload fields stay at their defaults
  pub fn failure(details: impl Into<String>) -> Self {
    Self {
      success: false,
      kv_error: Some(KvError::new(details)),
      ..Default::default()
    }
  }

  /// Error details, if the call failed
  pub fn error_details(&self) -> Option<&str> {
    self.kv_error.as_ref().map(|e| e.error_details.as_str())
  }
}

impl PutKeyRet {
  pub fn ok() -> Self {
    Self {
      success: true,
      kv_error: None,
    }
  }

  pub fn failure(details: impl Into<String>) -> Self {
    Self {
      success: false,
      kv_error: Some(KvError::new(details)),
    }
  }

  /// Error details, if the call failed
  pub fn error_details(&self) -> Option<&str> {
    self.kv_error.as_ref().map(|e| e.error_details.as_str())
  }
}
