//! In-memory storage backend for tests and development.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Record, Storage, StorageError, StorageIterator, StorageRead, StorageResult, WriteOptions};
use crate::util::BytesRange;

/// Ordered storage backed by a sorted map.
///
/// Writes are applied under a lock, so a batch is observed atomically.
/// Scans snapshot the matching records at open time; writes racing an open
/// scan are not reflected in it.
#[derive(Default)]
pub struct InMemoryStorage {
    records: RwLock<BTreeMap<Bytes, Bytes>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(records
            .get(&key)
            .map(|value| Record::new(key.clone(), value.clone())))
    }

    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send>> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let matching: Vec<Record> = records
            .iter()
            .filter(|(key, _)| range.contains(key))
            .map(|(key, value)| Record::new(key.clone(), value.clone()))
            .collect();
        Ok(Box::new(InMemoryIterator {
            records: matching.into_iter(),
        }))
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        _options: WriteOptions,
    ) -> StorageResult<()> {
        let mut map = self
            .records
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        for record in records {
            map.insert(record.key, record.value);
        }
        Ok(())
    }
}

struct InMemoryIterator {
    records: std::vec::IntoIter<Record>,
}

#[async_trait]
impl StorageIterator for InMemoryIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        Ok(self.records.next())
    }
}
