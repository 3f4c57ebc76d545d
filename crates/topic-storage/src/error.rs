//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Malformed key bytes
    #[error("Key error: {0}")]
    Key(String),

    /// A writer panicked while holding the write guard
    #[error("Write lock poisoned")]
    LockPoisoned,
}
