//! RocksDB wrapper for topic storage.
//!
//! Provides:
//! - Database open with column family setup
//! - Single-key reads and writes, prefix scans
//! - Atomic multi-key batches
//! - A write lock serializing read-modify-write sequences

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::column_families::build_cf_descriptors;
use crate::error::StorageError;

/// One operation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put {
        cf: &'static str,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        cf: &'static str,
        key: Vec<u8>,
    },
}

impl BatchOp {
    pub fn put(cf: &'static str, key: Vec<u8>, value: Vec<u8>) -> Self {
        BatchOp::Put { cf, key, value }
    }

    pub fn delete(cf: &'static str, key: Vec<u8>) -> Self {
        BatchOp::Delete { cf, key }
    }
}

/// Main storage interface
pub struct Storage {
    db: DB,
    /// Serializes read-modify-write sequences across callers
    write_lock: Mutex<()>,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(2);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, cf_name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(cf_name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(cf_name.to_string()))
    }

    /// Acquire the write lock.
    ///
    /// Hold the guard across a read and the write that depends on it.
    pub fn write_guard(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.write_lock.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Put a value into a column family.
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    /// Get a value from a column family.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(cf_name)?;
        let result = self.db.get_cf(cf, key)?;
        Ok(result)
    }

    /// Delete a value from a column family.
    pub fn delete(&self, cf_name: &str, key: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }

    /// Apply several writes atomically.
    pub fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        let mut batch = WriteBatch::default();
        let count = ops.len();
        for op in ops {
            match op {
                BatchOp::Put { cf, key, value } => batch.put_cf(self.cf(cf)?, key, value),
                BatchOp::Delete { cf, key } => batch.delete_cf(self.cf(cf)?, key),
            }
        }
        self.db.write(batch)?;
        debug!(ops = count, "Wrote batch");
        Ok(())
    }

    /// Collect entries with a given prefix, in key order.
    #[allow(clippy::type_complexity)]
    pub fn prefix_iterator(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        self.range_from(cf_name, prefix, prefix)
    }

    /// Collect entries starting at `start` while keys still match `prefix`.
    #[allow(clippy::type_complexity)]
    pub fn range_from(
        &self,
        cf_name: &str,
        start: &[u8],
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let cf = self.cf(cf_name)?;

        let mut results = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(start, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }

    /// Collect at most `limit` entries with a given prefix, last key first.
    #[allow(clippy::type_complexity)]
    pub fn prefix_tail(
        &self,
        cf_name: &str,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let cf = self.cf(cf_name)?;
        let upper = prefix_successor(prefix);
        let mode = match &upper {
            Some(upper) => IteratorMode::From(upper.as_slice(), Direction::Reverse),
            None => IteratorMode::End,
        };

        let mut results = Vec::new();
        for item in self.db.iterator_cf(cf, mode) {
            if results.len() >= limit {
                break;
            }
            let (key, value) = item?;
            if key.starts_with(prefix) {
                results.push((key.to_vec(), value.to_vec()));
            } else if &key[..] < prefix {
                break;
            }
        }
        Ok(results)
    }
}

/// Smallest key greater than every key starting with `prefix`.
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_families::{ALL_CF_NAMES, CF_LEASES, CF_TOPICS, CF_USAGE_HISTORY};
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_open_creates_column_families() {
        let (storage, _temp) = create_test_storage();
        for cf_name in ALL_CF_NAMES {
            assert!(
                storage.db.cf_handle(cf_name).is_some(),
                "CF {} should exist",
                cf_name
            );
        }
    }

    #[test]
    fn test_put_get_delete() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_TOPICS, b"topic:a", b"one").unwrap();
        assert_eq!(storage.get(CF_TOPICS, b"topic:a").unwrap(), Some(b"one".to_vec()));
        storage.delete(CF_TOPICS, b"topic:a").unwrap();
        assert_eq!(storage.get(CF_TOPICS, b"topic:a").unwrap(), None);
    }

    #[test]
    fn test_unknown_column_family() {
        let (storage, _temp) = create_test_storage();
        let err = storage.put("nope", b"k", b"v").unwrap_err();
        assert!(matches!(err, StorageError::ColumnFamilyNotFound(_)));
    }

    #[test]
    fn test_prefix_iterator_stops_at_prefix_end() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_USAGE_HISTORY, b"hist:a:1", b"1").unwrap();
        storage.put(CF_USAGE_HISTORY, b"hist:a:2", b"2").unwrap();
        storage.put(CF_USAGE_HISTORY, b"hist:b:1", b"3").unwrap();

        let rows = storage.prefix_iterator(CF_USAGE_HISTORY, b"hist:a:").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, b"1".to_vec());
        assert_eq!(rows[1].1, b"2".to_vec());
    }

    #[test]
    fn test_range_from_skips_earlier_keys() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_USAGE_HISTORY, b"time:ai:0001", b"old").unwrap();
        storage.put(CF_USAGE_HISTORY, b"time:ai:0005", b"new").unwrap();
        let rows = storage
            .range_from(CF_USAGE_HISTORY, b"time:ai:0003", b"time:ai:")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, b"new".to_vec());
    }

    #[test]
    fn test_write_batch_is_atomic_across_cfs() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_LEASES, b"lease:ai", b"old").unwrap();
        storage
            .write_batch(vec![
                BatchOp::put(CF_TOPICS, b"topic:x".to_vec(), b"x".to_vec()),
                BatchOp::put(CF_USAGE_HISTORY, b"hist:x:1".to_vec(), b"h".to_vec()),
                BatchOp::delete(CF_LEASES, b"lease:ai".to_vec()),
            ])
            .unwrap();
        assert!(storage.get(CF_TOPICS, b"topic:x").unwrap().is_some());
        assert!(storage.get(CF_USAGE_HISTORY, b"hist:x:1").unwrap().is_some());
        assert!(storage.get(CF_LEASES, b"lease:ai").unwrap().is_none());
    }

    #[test]
    fn test_write_batch_unknown_cf_writes_nothing() {
        let (storage, _temp) = create_test_storage();
        let result = storage.write_batch(vec![
            BatchOp::put(CF_TOPICS, b"topic:y".to_vec(), b"y".to_vec()),
            BatchOp::put("missing", b"k".to_vec(), b"v".to_vec()),
        ]);
        assert!(result.is_err());
        assert!(storage.get(CF_TOPICS, b"topic:y").unwrap().is_none());
    }

    #[test]
    fn test_prefix_tail_newest_first() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_USAGE_HISTORY, b"time:ai:0001", b"1").unwrap();
        storage.put(CF_USAGE_HISTORY, b"time:ai:0002", b"2").unwrap();
        storage.put(CF_USAGE_HISTORY, b"time:ai:0003", b"3").unwrap();
        storage.put(CF_USAGE_HISTORY, b"time:aj:0009", b"other").unwrap();
        storage.put(CF_USAGE_HISTORY, b"time:ah:0009", b"other").unwrap();

        let rows = storage.prefix_tail(CF_USAGE_HISTORY, b"time:ai:", 2).unwrap();
        let values: Vec<&[u8]> = rows.iter().map(|(_, v)| v.as_slice()).collect();
        assert_eq!(values, vec![b"3".as_slice(), b"2".as_slice()]);

        let all = storage.prefix_tail(CF_USAGE_HISTORY, b"time:ai:", 10).unwrap();
        assert_eq!(all.len(), 3);
        assert!(storage.prefix_tail(CF_USAGE_HISTORY, b"time:zz:", 10).unwrap().is_empty());
    }

    #[test]
    fn test_prefix_successor() {
        assert_eq!(prefix_successor(b"time:ai:"), Some(b"time:ai;".to_vec()));
        assert_eq!(prefix_successor(&[0x61, 0xFF]), Some(vec![0x62]));
        assert_eq!(prefix_successor(&[0xFF, 0xFF]), None);
    }

    #[test]
    fn test_write_guard_released_on_drop() {
        let (storage, _temp) = create_test_storage();
        {
            let _guard = storage.write_guard().unwrap();
        }
        assert!(storage.write_guard().is_ok());
    }
}
