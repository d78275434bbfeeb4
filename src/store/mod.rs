//! Sharded key-value store engine
//!
//! The key space is split into a fixed number of shards by FNV-1a hash. Each
//! shard sits behind its own `RwLock` and carries a timestamp oracle, so
//! writes to one shard never wait on another shard and every write in a shard
//! gets a timestamp above everything the shard issued before. With a data
//! directory configured, each write is made durable before it becomes visible.

mod disk;
mod error;
mod shard;

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::encoding::RecordValue;
use crate::util::time::now_ms;

pub use error::StoreError;
pub use shard::{DEFAULT_SHARDS, Record};

use disk::{DataDir, StoredRecord};
use shard::{Shard, shard_for};

/// Key-value store engine
pub struct Store {
  shards: Vec<RwLock<Shard>>,
  disk: Option<DataDir>,
}

impl Store {
  /// Create a new empty in-memory store
  pub fn new() -> Self {
    Self::with_shards(DEFAULT_SHARDS)
  }

  /// Create an empty in-memory store split into `num_shards` shards
  pub fn with_shards(num_shards: usize) -> Self {
    let num_shards = num_shards.max(1);
    Self {
      shards: (0..num_shards).map(|_| RwLock::new(Shard::default())).collect(),
      disk: None,
    }
  }

  /// Open a store as described by `config`, recovering any records kept in
  /// its data directory
  pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
    let mut store = Self::with_shards(config.num_shards);
    let Some(root) = &config.data_dir else {
      info!("Store opened in memory with {} shards", store.shard_count());
      return Ok(store);
    };

    let disk = DataDir::open(root)?;
    let recovered = disk.recover()?;
    let mut floor = recovered.oracle_floor;
    let count = recovered.records.len();
    for stored in &recovered.records {
      let record = &stored.record;
      floor = floor.max(record.db_modified_ts);
      let idx = store.shard_for(&record.key);
      let shard = store.shards[idx]
        .get_mut()
        .map_err(|_| StoreError::Poisoned(idx))?;
      shard.restore(
        record.key.clone(),
        Record {
          value: record.value.clone(),
          last_modified_ts: record.db_modified_ts,
        },
      );
    }
    // Shard placement may have changed since the files were written, so every
    // shard starts above the highest timestamp seen anywhere.
    for (idx, lock) in store.shards.iter_mut().enumerate() {
      lock
        .get_mut()
        .map_err(|_| StoreError::Poisoned(idx))?
        .advance_oracle(floor);
    }

    info!(
      "Store opened at {} with {} shards: recovered {} record files, {} keys, oracle floor {}",
      disk.root().display(),
      store.shard_count(),
      count,
      store.len(),
      floor
    );
    store.settle_records(&disk, recovered.records);
    store.disk = Some(disk);
    Ok(store)
  }

  /// Remove record files superseded by a newer file of the same key, then move
  /// the surviving files of keys whose shard changed into their new shard.
  fn settle_records(&self, disk: &DataDir, records: Vec<StoredRecord>) {
    let (live, stale): (Vec<_>, Vec<_>) = records.into_iter().partition(|stored| {
      let idx = self.shard_for(&stored.record.key);
      self
        .read_shard(idx)
        .ok()
        .and_then(|shard| shard.get(&stored.record.key).map(|r| r.last_modified_ts))
        == Some(stored.record.db_modified_ts)
    });

    for stored in &stale {
      match disk.remove_record(&stored.path) {
        Ok(()) => debug!("Removed superseded record file {}", stored.path.display()),
        Err(e) => warn!("Failed to remove superseded record file: {}", e),
      }
    }

    let mut moved = 0;
    for stored in live {
      let idx = self.shard_for(&stored.record.key);
      if stored.shard == idx {
        continue;
      }
      let record = RecordValue::new(
        stored.record.key,
        stored.record.value,
        stored.record.db_modified_ts,
      );
      match disk
        .write_record(idx, &record)
        .and_then(|()| disk.remove_record(&stored.path))
      {
        Ok(()) => moved += 1,
        Err(e) => warn!("Failed to move record of key {} to shard {}: {}", record.key, idx, e),
      }
    }
    if moved > 0 || !stale.is_empty() {
      info!(
        "Data directory settled: {} record files moved, {} superseded files removed",
        moved,
        stale.len()
      );
    }
  }

  pub fn shard_count(&self) -> usize {
    self.shards.len()
  }

  /// Shard index owning `key`
  pub fn shard_for(&self, key: &str) -> usize {
    shard_for(key, self.shards.len())
  }

  fn read_shard(&self, idx: usize) -> Result<RwLockReadGuard<'_, Shard>, StoreError> {
    self.shards[idx].read().map_err(|_| StoreError::Poisoned(idx))
  }

  fn write_shard(&self, idx: usize) -> Result<RwLockWriteGuard<'_, Shard>, StoreError> {
    self.shards[idx].write().map_err(|_| StoreError::Poisoned(idx))
  }

  /// Set `key` to `value`, returning the timestamp assigned to the write
  ///
  /// The timestamp is strictly greater than any earlier write to the same
  /// shard, so it also orders successive writes to `key`.
  pub fn put(&self, key: String, value: String) -> Result<u64, StoreError> {
    if key.is_empty() {
      return Err(StoreError::EmptyKey);
    }
    if value.is_empty() {
      return Err(StoreError::EmptyValue);
    }

    let idx = self.shard_for(&key);
    let mut shard = self.write_shard(idx)?;
    let ts = shard.next_timestamp(now_ms());

    if let Some(disk) = &self.disk {
      disk.persist_oracle(idx, ts)?;
      // Persisted, so never hand it out again even if the record write fails.
      shard.advance_oracle(ts);
      disk.write_record(idx, &RecordValue::new(key.as_str(), value.as_str(), ts))?;
    }

    debug!("PUT key={} shard={} ts={}", key, idx, ts);
    shard.insert(
      key,
      Record {
        value,
        last_modified_ts: ts,
      },
    );
    Ok(ts)
  }

  /// Get the record for `key`
  pub fn get(&self, key: &str) -> Result<Record, StoreError> {
    if key.is_empty() {
      return Err(StoreError::EmptyKey);
    }

    let idx = self.shard_for(key);
    let shard = self.read_shard(idx)?;
    match shard.get(key) {
      Some(record) => {
        debug!("GET key={} shard={} ts={}", key, idx, record.last_modified_ts);
        Ok(record.clone())
      }
      None => Err(StoreError::NotFound(key.to_string())),
    }
  }

  /// Number of keys held across all shards
  pub fn len(&self) -> usize {
    self
      .shards
      .iter()
      .filter_map(|lock| lock.read().ok().map(|shard| shard.len()))
      .sum()
  }

  /// Run `f` while holding the write lock of the shard owning `key`
  #[cfg(test)]
  pub(crate) fn with_shard_locked<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
    let _guard = self.shards[self.shard_for(key)].write();
    f()
  }
}

impl Default for Store {
  fn default() -> Self {
    Self::new()
  }
}
