//! gRPC protocol implementation
//!
//! This module provides the `kvstore.KvStoreInterface` wire messages, the
//! generated service plumbing and the GetKey/PutKey command handlers.

pub mod get;
mod message;
pub mod put;

pub use get::GetKeyCmd;
pub use message::{GetKeyArg, GetKeyRet, KvError, PutKeyArg, PutKeyRet};
pub use put::PutKeyCmd;

/// Server and client stubs generated by `build.rs`
pub mod service {
  include!(concat!(env!("OUT_DIR"), "/kvstore.KvStoreInterface.rs"));
}
