//! The per-submission ingestion pipeline.
//!
//! One submission flows through: timestamp normalization → canonical
//! serialization → fingerprint → dedup lookup → durable raw write →
//! compaction. The stages run as awaited calls inside one logical task; the
//! [queue](crate::queue) guarantees no two pipelines overlap on one store.

use crate::compact::Compactor;
use crate::error::Result;
use crate::fingerprint::fingerprint;
use crate::model::{MaterializedStats, Snapshot};
use crate::storage::StatsStorage;
use crate::time::Timestamp;

/// Outcome of processing one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IngestOutcome {
    /// The submission was new: its raw record is durable and the bucket has
    /// been recompacted.
    Stored(Timestamp),
    /// A submission with identical content was already stored. Nothing was
    /// rewritten and no compaction ran. A successful no-op, not an error.
    Duplicate(Timestamp),
}

pub(crate) struct Ingestor {
    storage: StatsStorage,
    compactor: Compactor,
}

impl Ingestor {
    pub(crate) fn new(storage: StatsStorage, compactor: Compactor) -> Self {
        Self { storage, compactor }
    }

    /// Processes one submission to completion.
    ///
    /// The dedup lookup distinguishes three cases: an existing record is a
    /// duplicate, a miss means the submission is new, and any other lookup
    /// failure propagates as a storage error. The stored value is exactly
    /// the canonical bytes the fingerprint was computed over, so two writers
    /// racing on the same key would write identical content.
    ///
    /// A compaction failure after the raw write leaves the raw record
    /// durably stored; the error propagates and the bucket can be
    /// recompacted later.
    #[tracing::instrument(level = "debug", skip_all)]
    pub(crate) async fn ingest(&self, mut snapshot: Snapshot) -> Result<IngestOutcome> {
        let ts = Timestamp::parse(&snapshot.ts)?;
        snapshot.ts = ts.as_str().to_string();

        let canonical = snapshot.canonical_bytes()?;
        let fp = fingerprint(&canonical);

        if self.storage.as_read().raw_exists(&ts, &fp).await? {
            return Ok(IngestOutcome::Duplicate(ts));
        }

        self.storage.write_raw(&ts, &fp, canonical).await?;
        self.compactor.compact(&ts).await?;
        Ok(IngestOutcome::Stored(ts))
    }

    /// Recompacts one bucket outside the submission path.
    pub(crate) async fn compact(&self, ts: &Timestamp) -> Result<Option<MaterializedStats>> {
        self.compactor.compact(ts).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::merge::{DefaultMerger, DefaultProcessor};

    fn ingestor(storage: &StatsStorage) -> Ingestor {
        let compactor = Compactor::new(
            storage.clone(),
            Arc::new(DefaultMerger),
            Arc::new(DefaultProcessor),
        );
        Ingestor::new(storage.clone(), compactor)
    }

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn snapshot_with_counter(bucket: &str, name: &str, value: f64) -> Snapshot {
        let mut snapshot = Snapshot::new(bucket);
        snapshot.counters.insert(name.to_string(), value);
        snapshot
    }

    async fn count_raws(storage: &StatsStorage, bucket: &Timestamp) -> usize {
        let mut iter = storage.as_read().scan_raws(bucket).await.unwrap();
        let mut count = 0;
        while iter.next().await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn should_store_new_submission() {
        // given
        let storage = StatsStorage::in_memory();
        let snapshot = snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0);

        // when
        let outcome = ingestor(&storage).ingest(snapshot).await.unwrap();

        // then
        assert_eq!(
            outcome,
            IngestOutcome::Stored(ts("2024-01-01T00:00:00Z"))
        );
        assert_eq!(count_raws(&storage, &ts("2024-01-01T00:00:00Z")).await, 1);
    }

    #[tokio::test]
    async fn should_recognize_duplicate_submission() {
        // given
        let storage = StatsStorage::in_memory();
        let subject = ingestor(&storage);
        let snapshot = snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0);
        subject.ingest(snapshot.clone()).await.unwrap();

        // when - identical content resubmitted
        let outcome = subject.ingest(snapshot).await.unwrap();

        // then - exactly one raw record remains
        assert_eq!(
            outcome,
            IngestOutcome::Duplicate(ts("2024-01-01T00:00:00Z"))
        );
        assert_eq!(count_raws(&storage, &ts("2024-01-01T00:00:00Z")).await, 1);
    }

    #[tokio::test]
    async fn should_treat_equivalent_timestamp_forms_as_duplicates() {
        // given - same instant written two ways
        let storage = StatsStorage::in_memory();
        let subject = ingestor(&storage);
        subject
            .ingest(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0))
            .await
            .unwrap();

        // when
        let outcome = subject
            .ingest(snapshot_with_counter(
                "2024-01-01T01:00:00+01:00",
                "hits",
                5.0,
            ))
            .await
            .unwrap();

        // then
        assert_eq!(
            outcome,
            IngestOutcome::Duplicate(ts("2024-01-01T00:00:00Z"))
        );
    }

    #[tokio::test]
    async fn should_compact_after_each_new_submission() {
        // given
        let storage = StatsStorage::in_memory();
        let subject = ingestor(&storage);

        // when
        subject
            .ingest(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0))
            .await
            .unwrap();
        subject
            .ingest(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 3.0))
            .await
            .unwrap();

        // then
        let stats = storage
            .as_read()
            .get_materialized(&ts("2024-01-01T00:00:00Z"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.counters["hits"], 8.0);
    }

    #[tokio::test]
    async fn should_not_recompact_on_duplicate() {
        // given - a compacted bucket, then its materialized record replaced
        // with a marker value
        let storage = StatsStorage::in_memory();
        let subject = ingestor(&storage);
        let snapshot = snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0);
        subject.ingest(snapshot.clone()).await.unwrap();

        let mut marker = storage
            .as_read()
            .get_materialized(&ts("2024-01-01T00:00:00Z"))
            .await
            .unwrap()
            .unwrap();
        marker.counters.insert("hits".to_string(), 999.0);
        storage.write_materialized(&marker).await.unwrap();

        // when
        subject.ingest(snapshot).await.unwrap();

        // then - the marker survived, so no compaction ran
        let read = storage
            .as_read()
            .get_materialized(&ts("2024-01-01T00:00:00Z"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.counters["hits"], 999.0);
    }

    #[tokio::test]
    async fn should_reject_snapshot_with_malformed_timestamp() {
        // given
        let storage = StatsStorage::in_memory();
        let snapshot = snapshot_with_counter("yesterday-ish", "hits", 5.0);

        // when
        let result = ingestor(&storage).ingest(snapshot).await;

        // then
        assert!(matches!(result, Err(crate::error::Error::InvalidInput(_))));
    }
}
