//! Stats-specific storage wrappers.
//!
//! This module provides [`StatsStorage`] and [`StatsStorageRead`] which wrap
//! the underlying storage traits with domain operations: raw submission
//! lookup and persistence, bucket scans, and materialized record access.

use std::sync::Arc;

use bytes::Bytes;
use common::{Record, Storage, StorageIterator, StorageRead, WriteOptions};

use crate::error::{Error, Result};
use crate::model::{MaterializedStats, Snapshot};
use crate::serde::{MaterializedKey, RawKey};
use crate::time::Timestamp;

/// Read-only stats storage operations.
#[derive(Clone)]
pub(crate) struct StatsStorageRead {
    storage: Arc<dyn StorageRead>,
}

impl StatsStorageRead {
    pub(crate) fn new(storage: Arc<dyn StorageRead>) -> Self {
        Self { storage }
    }

    /// Gets a single record by raw key bytes.
    #[cfg(test)]
    pub(crate) async fn get(&self, key: Bytes) -> Result<Option<Record>> {
        self.storage.get(key).await.map_err(Error::from)
    }

    /// Point lookup for a raw submission by bucket and fingerprint.
    ///
    /// `Ok(false)` means the key is genuinely absent; a failing lookup is an
    /// error, never treated as absence.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn raw_exists(&self, ts: &Timestamp, fingerprint: &str) -> Result<bool> {
        let key = RawKey::new(ts, fingerprint).serialize();
        let record = self.storage.get(key).await?;
        Ok(record.is_some())
    }

    /// Scans all raw submissions for one bucket, in ascending key order.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn scan_raws(&self, ts: &Timestamp) -> Result<RawIterator> {
        let range = RawKey::bucket_range(ts);
        let inner = self.storage.scan_iter(range).await?;
        Ok(RawIterator { inner })
    }

    /// Fetches the materialized record for a bucket, if one exists.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn get_materialized(
        &self,
        ts: &Timestamp,
    ) -> Result<Option<MaterializedStats>> {
        let key = MaterializedKey::new(ts).serialize();
        match self.storage.get(key).await? {
            Some(record) => Ok(Some(MaterializedStats::from_bytes(&record.value)?)),
            None => Ok(None),
        }
    }

    /// Opens an ordered scan over materialized records in `[from, to)`.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn scan_materialized(
        &self,
        from: &Timestamp,
        to: &Timestamp,
    ) -> Result<Box<dyn StorageIterator + Send>> {
        let range = MaterializedKey::scan_range(from, to);
        Ok(self.storage.scan_iter(range).await?)
    }
}

/// Iterator over one bucket's raw submissions.
pub(crate) struct RawIterator {
    inner: Box<dyn StorageIterator + Send>,
}

impl RawIterator {
    /// Returns the next raw submission in key order, or `None` if exhausted.
    pub(crate) async fn next(&mut self) -> Result<Option<Snapshot>> {
        match self.inner.next().await? {
            Some(record) => Ok(Some(Snapshot::from_bytes(&record.value)?)),
            None => Ok(None),
        }
    }
}

/// Read-write stats storage operations.
#[derive(Clone)]
pub(crate) struct StatsStorage {
    storage: Arc<dyn Storage>,
}

impl StatsStorage {
    pub(crate) fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Creates stats storage with an in-memory backend.
    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        use common::storage::in_memory::InMemoryStorage;
        Self::new(Arc::new(InMemoryStorage::new()))
    }

    /// Returns a read-only view of this storage.
    pub(crate) fn as_read(&self) -> StatsStorageRead {
        StatsStorageRead::new(Arc::clone(&self.storage) as Arc<dyn StorageRead>)
    }

    /// Durably persists a raw submission's canonical bytes under its
    /// content-addressed key.
    ///
    /// Written as a single-record batch with `await_durable` set: the raw
    /// record is the source of truth the materialized record is re-derived
    /// from, so it must survive a crash on its own.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn write_raw(
        &self,
        ts: &Timestamp,
        fingerprint: &str,
        canonical: Vec<u8>,
    ) -> Result<()> {
        let key = RawKey::new(ts, fingerprint).serialize();
        let record = Record::new(key, Bytes::from(canonical));
        let options = WriteOptions { await_durable: true };
        self.storage
            .put_with_options(vec![record], options)
            .await
            .map_err(Error::from)
    }

    /// Writes the materialized record for a bucket, overwriting any prior
    /// value unconditionally.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn write_materialized(&self, stats: &MaterializedStats) -> Result<()> {
        let ts = Timestamp::parse(&stats.ts)?;
        let key = MaterializedKey::new(&ts).serialize();
        let value = Bytes::from(stats.to_bytes()?);
        self.storage
            .put(vec![Record::new(key, value)])
            .await
            .map_err(Error::from)
    }
}
