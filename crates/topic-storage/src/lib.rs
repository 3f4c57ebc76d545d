//! Storage layer for the topic engine.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for topics, history, blocks and leases
//! - Time-ordered keys for append-only usage history
//! - Atomic multi-key writes via WriteBatch
//! - A write lock for read-modify-write sequences

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use db::{BatchOp, Storage};
pub use error::StorageError;
pub use keys::{BlockKey, CategoryIndexKey, HistoryKey, LeaseKey, TimelineKey, TopicKey};
