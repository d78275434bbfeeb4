use std::collections::HashMap;

use crate::util::time::next_after;

/// Default number of shards the key space is split into
pub const DEFAULT_SHARDS: usize = 9;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const FNV64_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 32-bit FNV-1a hash of the key bytes
fn fnv1a(key: &str) -> u32 {
  key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
    (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
  })
}

/// 64-bit FNV-1a hash of the key bytes
pub fn fnv1a_64(key: &str) -> u64 {
  key.bytes().fold(FNV64_OFFSET_BASIS, |hash, byte| {
    (hash ^ u64::from(byte)).wrapping_mul(FNV64_PRIME)
  })
}

/// Shard owning `key` when the key space is split into `num_shards`
pub fn shard_for(key: &str, num_shards: usize) -> usize {
  fnv1a(key) as usize % num_shards
}

/// Stored value and last modification time of one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
  pub value: String,
  /// Unix epoch milliseconds, strictly increasing per key
  pub last_modified_ts: u64,
}

/// One partition of the key space together with its timestamp oracle
#[derive(Debug, Default)]
pub struct Shard {
  entries: HashMap<String, Record>,
  /// Last timestamp handed out by this shard
  oracle_ts: u64,
}

impl Shard {
  /// Issue the next write timestamp, strictly after every timestamp this
  /// shard has issued or recovered
  pub fn next_timestamp(&self, now: u64) -> u64 {
    next_after(self.oracle_ts, now)
  }

  /// Record that `ts` has been handed out
  pub fn advance_oracle(&mut self, ts: u64) {
    self.oracle_ts = self.oracle_ts.max(ts);
  }

  pub fn get(&self, key: &str) -> Option<&Record> {
    self.entries.get(key)
  }

  /// Insert or overwrite the record for `key`
  pub fn insert(&mut self, key: String, record: Record) {
    self.advance_oracle(record.last_modified_ts);
    self.entries.insert(key, record);
  }

  /// Insert `record` unless a record with a newer timestamp is already held
  pub fn restore(&mut self, key: String, record: Record) {
    let newer = self
      .entries
      .get(&key)
      .is_none_or(|current| current.last_modified_ts < record.last_modified_ts);
    if newer {
      self.insert(key, record);
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }
}
