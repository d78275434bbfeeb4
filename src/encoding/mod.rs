//! Value encoding/decoding for storage
//!
//! This module provides the on-disk encoding of records kept in the data
//! directory.

pub mod record;

/// Current format version for all encoded types
pub const CURRENT_VERSION: u8 = 2;

pub use record::{DecodeError, RecordValue};
