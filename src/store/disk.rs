//! Data directory layout
//!
//! ```text
//! <root>/oracle/<shard_id>                  last issued timestamp of the shard, decimal
//! <root>/<shard_id>/<hex(key)>.json         record document of a key up to 125 bytes
//! <root>/<shard_id>/~<fnv64>-<slot>.json    record document of a longer key
//! ```
//!
//! Every record document holds its own key, so recovery never depends on the
//! file name except for version 1 documents. Files are replaced by writing a
//! sibling `.tmp` file, syncing it and renaming it over the target, so a crash
//! leaves either the old or the new content.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::encoding::RecordValue;
use crate::store::StoreError;
use crate::store::shard::fnv1a_64;

const ORACLE_DIR: &str = "oracle";
const RECORD_EXT: &str = "json";
const TMP_EXT: &str = "tmp";
const DIGEST_PREFIX: char = '~';

/// Longest key stored under its hex encoding (255 byte file name limit, minus
/// the extension)
const MAX_HEX_KEY_LEN: usize = 125;

/// One record document found in the data directory
#[derive(Debug)]
pub struct StoredRecord {
  pub path: PathBuf,
  /// Shard directory the file was found in
  pub shard: usize,
  pub record: RecordValue,
}

/// Everything found in the data directory at startup
#[derive(Debug, Default)]
pub struct Recovered {
  /// Highest oracle timestamp persisted by any shard
  pub oracle_floor: u64,
  pub records: Vec<StoredRecord>,
}

/// Durable storage backing the in-memory shards
#[derive(Debug)]
pub struct DataDir {
  root: PathBuf,
}

impl DataDir {
  /// Open the data directory, creating it if needed
  pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let root = root.into();
    fs::create_dir_all(root.join(ORACLE_DIR)).map_err(|source| StoreError::Open {
      path: root.clone(),
      source,
    })?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn oracle_path(&self, shard: usize) -> PathBuf {
    self.root.join(ORACLE_DIR).join(shard.to_string())
  }

  /// File holding `key` in `shard`. Long keys try digest slots in order until they
  /// find their own document or a free slot.
  fn record_path(&self, shard: usize, key: &str) -> io::Result<PathBuf> {
    let dir = self.root.join(shard.to_string());
    if key.len() <= MAX_HEX_KEY_LEN {
      return Ok(dir.join(format!("{}.{}", hex::encode(key), RECORD_EXT)));
    }

    let digest = fnv1a_64(key);
    let mut slot = 0u32;
    loop {
      let path = dir.join(format!("{}{:016x}-{}.{}", DIGEST_PREFIX, digest, slot, RECORD_EXT));
      match fs::read(&path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(path),
        Err(e) => return Err(e),
        Ok(bytes) => match RecordValue::deserialize(&bytes) {
          Ok(existing) if existing.key != key => {
            debug!("Digest collision at {}, trying next slot", path.display());
            slot += 1;
          }
          _ => return Ok(path),
        },
      }
    }
  }

  /// Persist the shard's latest oracle timestamp
  pub fn persist_oracle(&self, shard: usize, ts: u64) -> Result<(), StoreError> {
    write_atomic(&self.oracle_path(shard), ts.to_string().as_bytes())
      .map_err(|source| StoreError::Oracle { shard, source })
  }

  /// Write the record document for `record.key` into `shard`
  pub fn write_record(&self, shard: usize, record: &RecordValue) -> Result<(), StoreError> {
    let bytes = record.serialize()?;
    let dir = self.root.join(shard.to_string());
    fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
      path: dir.clone(),
      source,
    })?;
    let path = self
      .record_path(shard, &record.key)
      .map_err(|source| StoreError::Write {
        path: dir.clone(),
        source,
      })?;
    write_atomic(&path, &bytes).map_err(|source| StoreError::Write { path, source })
  }

  /// Delete a record document that recovery found superseded or misplaced
  pub fn remove_record(&self, path: &Path) -> Result<(), StoreError> {
    fs::remove_file(path).map_err(|source| StoreError::Write {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load every oracle value and record document. Unreadable entries are
  /// logged and skipped.
  pub fn recover(&self) -> Result<Recovered, StoreError> {
    let mut recovered = Recovered::default();
    let open_err = |source| StoreError::Open {
      path: self.root.clone(),
      source,
    };

    for entry in fs::read_dir(self.root.join(ORACLE_DIR)).map_err(open_err)? {
      let path = match entry {
        Ok(entry) => entry.path(),
        Err(e) => {
          warn!("Skipping oracle entry: {}", e);
          continue;
        }
      };
      if !path.is_file() || has_ext(&path, TMP_EXT) {
        continue;
      }
      match fs::read_to_string(&path).map(|s| s.trim().parse::<u64>()) {
        Ok(Ok(ts)) => {
          debug!("Recovered oracle timestamp {} from {}", ts, path.display());
          recovered.oracle_floor = recovered.oracle_floor.max(ts);
        }
        Ok(Err(e)) => warn!("Invalid oracle timestamp in {}: {}", path.display(), e),
        Err(e) => warn!("Failed to read {}: {}", path.display(), e),
      }
    }

    for entry in fs::read_dir(&self.root).map_err(open_err)? {
      let Ok(entry) = entry else { continue };
      let dir = entry.path();
      if !dir.is_dir() {
        continue;
      }
      let Some(shard) = dir
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.parse::<usize>().ok())
      else {
        continue;
      };
      let files = match fs::read_dir(&dir) {
        Ok(files) => files,
        Err(e) => {
          warn!("Failed to read shard directory {}: {}", dir.display(), e);
          continue;
        }
      };
      for file in files.flatten() {
        let path = file.path();
        if !has_ext(&path, RECORD_EXT) {
          continue;
        }
        match load_record(&path) {
          Ok(record) => recovered.records.push(StoredRecord {
            path,
            shard,
            record,
          }),
          Err(e) => warn!("Skipping record file {}: {}", path.display(), e),
        }
      }
    }

    Ok(recovered)
  }
}

fn has_ext(path: &Path, ext: &str) -> bool {
  path.extension().is_some_and(|e| e == ext)
}

fn load_record(path: &Path) -> Result<RecordValue, Box<dyn std::error::Error>> {
  let mut record = RecordValue::deserialize(&fs::read(path)?)?;
  if record.key.is_empty() {
    let stem = path
      .file_stem()
      .and_then(|s| s.to_str())
      .ok_or("file name is not valid UTF-8")?;
    record.key = String::from_utf8(hex::decode(stem)?)?;
  }
  if record.key.is_empty() {
    return Err("empty key".into());
  }
  Ok(record)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
  let tmp = path.with_extension(TMP_EXT);
  let mut file = File::create(&tmp)?;
  file.write_all(bytes)?;
  file.sync_all()?;
  fs::rename(&tmp, path)?;
  sync_dir(path.parent())
}

/// Make a rename inside `dir` durable
#[cfg(unix)]
fn sync_dir(dir: Option<&Path>) -> io::Result<()> {
  match dir {
    Some(dir) => File::open(dir)?.sync_all(),
    None => Ok(()),
  }
}

#[cfg(not(unix))]
fn sync_dir(_dir: Option<&Path>) -> io::Result<()> {
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn keys_of(recovered: &Recovered) -> Vec<String> {
    let mut keys: Vec<String> = recovered
      .records
      .iter()
      .map(|stored| stored.record.key.clone())
      .collect();
    keys.sort();
    keys
  }

  #[test]
  fn test_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DataDir::open(tmp.path()).unwrap();

    dir.persist_oracle(3, 1234).unwrap();
    dir
      .write_record(3, &RecordValue::new("foo", "bar", 1234))
      .unwrap();

    let oracle = fs::read_to_string(tmp.path().join("oracle").join("3")).unwrap();
    assert_eq!(oracle, "1234");
    assert!(tmp.path().join("3").join("666f6f.json").is_file());
    assert!(!tmp.path().join("3").join("666f6f.tmp").exists());
  }

  #[test]
  fn test_write_atomic_replaces_content() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("target.json");

    write_atomic(&path, b"old").unwrap();
    write_atomic(&path, b"new").unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"new");
    assert!(!tmp.path().join("target.tmp").exists());
  }

  #[test]
  fn test_recover_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DataDir::open(tmp.path()).unwrap();
    dir.persist_oracle(0, 50).unwrap();
    dir.persist_oracle(1, 90).unwrap();
    dir.write_record(0, &RecordValue::new("a", "1", 50)).unwrap();
    dir.write_record(1, &RecordValue::new("b/c", "2", 80)).unwrap();

    let mut recovered = dir.recover().unwrap();
    recovered.records.sort_by(|x, y| x.record.key.cmp(&y.record.key));

    assert_eq!(recovered.oracle_floor, 90);
    assert_eq!(keys_of(&recovered), ["a", "b/c"]);
    assert_eq!(recovered.records[1].shard, 1);
    assert_eq!(recovered.records[1].record.db_modified_ts, 80);
  }

  #[test]
  fn test_long_key_uses_digest_name() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DataDir::open(tmp.path()).unwrap();
    let key = "k".repeat(4096);

    dir.write_record(0, &RecordValue::new(key.as_str(), "v1", 1)).unwrap();
    dir.write_record(0, &RecordValue::new(key.as_str(), "v2", 2)).unwrap();

    let names: Vec<String> = fs::read_dir(tmp.path().join("0"))
      .unwrap()
      .map(|e| e.unwrap().file_name().into_string().unwrap())
      .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with(DIGEST_PREFIX));
    assert!(names[0].len() < 64);

    let recovered = dir.recover().unwrap();
    assert_eq!(recovered.records.len(), 1);
    assert_eq!(recovered.records[0].record.key, key);
    assert_eq!(recovered.records[0].record.value, "v2");
  }

  #[test]
  fn test_digest_collision_takes_next_slot() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DataDir::open(tmp.path()).unwrap();
    let key = "x".repeat(200);

    // Occupy the first slot of the key's digest with another key's document.
    let first_slot = tmp
      .path()
      .join("0")
      .join(format!("~{:016x}-0.json", fnv1a_64(&key)));
    fs::create_dir_all(first_slot.parent().unwrap()).unwrap();
    let squatter = RecordValue::new("y".repeat(200), "other", 5);
    fs::write(&first_slot, squatter.serialize().unwrap()).unwrap();

    dir.write_record(0, &RecordValue::new(key.as_str(), "mine", 6)).unwrap();

    let recovered = dir.recover().unwrap();
    assert_eq!(keys_of(&recovered), [key, "y".repeat(200)]);
    assert_eq!(
      RecordValue::deserialize(&fs::read(&first_slot).unwrap()).unwrap().value,
      "other"
    );
  }

  #[test]
  fn test_recover_version_one_document() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DataDir::open(tmp.path()).unwrap();
    fs::create_dir_all(tmp.path().join("4")).unwrap();
    fs::write(
      tmp.path().join("4").join("666f6f.json"),
      br#"{"version":1,"value":"bar","db_modified_ts":9}"#,
    )
    .unwrap();

    let recovered = dir.recover().unwrap();
    assert_eq!(keys_of(&recovered), ["foo"]);
    assert_eq!(recovered.records[0].record.value, "bar");
  }

  #[test]
  fn test_recover_skips_corrupt_files() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DataDir::open(tmp.path()).unwrap();
    dir.write_record(2, &RecordValue::new("good", "v", 10)).unwrap();
    fs::write(tmp.path().join("2").join("zz.json"), b"{}").unwrap();
    fs::write(tmp.path().join("2").join("676f6f64.tmp"), b"junk").unwrap();
    fs::write(tmp.path().join("oracle").join("2"), b"not a number").unwrap();

    let recovered = dir.recover().unwrap();
    assert_eq!(recovered.oracle_floor, 0);
    assert_eq!(keys_of(&recovered), ["good"]);
  }

  #[test]
  fn test_remove_record() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DataDir::open(tmp.path()).unwrap();
    dir.write_record(1, &RecordValue::new("a", "1", 3)).unwrap();

    let recovered = dir.recover().unwrap();
    dir.remove_record(&recovered.records[0].path).unwrap();

    assert!(dir.recover().unwrap().records.is_empty());
  }
}
