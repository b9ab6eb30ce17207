//! Ordered key-value storage contract.
//!
//! Services in this workspace treat storage as a capability: point lookups,
//! atomic batch writes, and ordered range scans over byte-string keys sorted
//! ascending by byte value. Two backends implement the contract:
//!
//! - [`in_memory::InMemoryStorage`]: a sorted map, for tests and development.
//! - [`slate::SlateDbStorage`]: SlateDB, an LSM tree over object storage,
//!   for durable deployment.
//!
//! A lookup miss is structural (`Ok(None)`), never an error variant; callers
//! distinguish "absent" from "failed" by type, not by inspecting messages.

pub mod config;
pub mod factory;
pub mod in_memory;
pub mod slate;

use async_trait::async_trait;
use bytes::Bytes;

use crate::util::BytesRange;

/// A key/value pair as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Errors surfaced by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The underlying engine failed on a get, put, or scan.
    Storage(String),
    /// A fault in the storage layer itself.
    Internal(String),
}

impl StorageError {
    /// Wraps a backend error into the generic storage variant.
    pub fn from_storage(err: impl std::fmt::Display) -> Self {
        StorageError::Storage(err.to_string())
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Storage(msg) => write!(f, "storage error: {}", msg),
            StorageError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Options controlling write durability.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// When true, the write does not return until the backend reports the
    /// data durable (e.g. acknowledged by the object store). When false, the
    /// write may return once the data is in memory.
    pub await_durable: bool,
}

/// Read operations on ordered storage.
#[async_trait]
pub trait StorageRead: Send + Sync {
    /// Retrieves a single record by key, or `None` if the key is absent.
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>>;

    /// Opens an ordered scan over the given key range.
    ///
    /// Records are yielded in ascending key order. Each call opens an
    /// independent scan; the iterator owns whatever backend state it needs.
    async fn scan_iter(&self, range: BytesRange)
        -> StorageResult<Box<dyn StorageIterator + Send>>;

    /// Collects an ordered scan into a vector.
    async fn scan(&self, range: BytesRange) -> StorageResult<Vec<Record>> {
        let mut iter = self.scan_iter(range).await?;
        let mut records = Vec::new();
        while let Some(record) = iter.next().await? {
            records.push(record);
        }
        Ok(records)
    }
}

/// A streaming cursor over scan results.
#[async_trait]
pub trait StorageIterator {
    /// Returns the next record in key order, or `None` when exhausted.
    async fn next(&mut self) -> StorageResult<Option<Record>>;
}

/// Read-write operations on ordered storage.
#[async_trait]
pub trait Storage: StorageRead {
    /// Writes a batch of records atomically with default options.
    async fn put(&self, records: Vec<Record>) -> StorageResult<()> {
        self.put_with_options(records, WriteOptions::default()).await
    }

    /// Writes a batch of records atomically.
    ///
    /// All records in one call are applied as a single write; a reader never
    /// observes a partially applied batch.
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()>;
}
