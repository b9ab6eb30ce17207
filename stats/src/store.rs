//! The main stats store with submission and query APIs.

use std::sync::Arc;

use async_trait::async_trait;
use common::Storage;
use common::storage::factory::create_storage;

use crate::compact::Compactor;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::Ingestor;
use crate::merge::{DefaultMerger, DefaultProcessor, SnapshotMerger, SnapshotProcessor};
use crate::model::{MaterializedStats, MetricKind, Snapshot};
use crate::queue::IngestQueue;
use crate::reader;
use crate::reader::{MaterializedIterator, MetricIterator, StatsRead};
use crate::storage::StatsStorage;
use crate::time::IntoTimestamp;

/// A durable time-bucketed metrics store.
///
/// Collectors submit [`Snapshot`]s tagged with a bucket timestamp; the store
/// retains every distinct submission, folds each bucket's submissions into
/// one materialized aggregate, and serves time range queries over the
/// result via the [`StatsRead`] trait.
///
/// # Write Path
///
/// [`submit`](StatsDb::submit) is fire-and-forget: it validates the bucket
/// timestamp, enqueues the snapshot, and returns. A single worker owned by
/// this instance processes submissions strictly in order, one at a time, so
/// two submissions for the same bucket can never race their
/// read-merge-write cycles. One instance must be the sole writer for its
/// underlying storage; nothing here coordinates across processes.
///
/// # Read Path
///
/// Reads go straight to storage, unserialized against the queue. A read
/// racing a compaction sees the bucket's previous or new aggregate, never a
/// partial one. Use [`flush`](StatsDb::flush) to await previously enqueued
/// submissions when read-your-writes behavior is needed.
///
/// # Example
///
/// ```ignore
/// use stats::{Config, Snapshot, StatsDb, StatsRead};
///
/// let db = StatsDb::open(Config::default()).await?;
///
/// let mut snapshot = Snapshot::new("2024-01-01T00:00:00Z");
/// snapshot.counters.insert("requests".to_string(), 42.0);
/// db.submit(snapshot)?;
/// db.flush().await?;
///
/// let stats = db.get_materialized("2024-01-01T00:00:00Z").await?;
/// ```
pub struct StatsDb {
    storage: StatsStorage,
    queue: IngestQueue,
}

impl StatsDb {
    /// Opens a stats store with the default merge and post-processing
    /// semantics ([`DefaultMerger`], [`DefaultProcessor`]).
    pub async fn open(config: Config) -> Result<Self> {
        Self::open_with(config, Arc::new(DefaultMerger), Arc::new(DefaultProcessor)).await
    }

    /// Opens a stats store with caller-provided merge and post-processing
    /// implementations.
    pub async fn open_with(
        config: Config,
        merger: Arc<dyn SnapshotMerger>,
        processor: Arc<dyn SnapshotProcessor>,
    ) -> Result<Self> {
        let storage = create_storage(&config.storage)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(Self::assemble(storage, merger, processor))
    }

    fn assemble(
        storage: Arc<dyn Storage>,
        merger: Arc<dyn SnapshotMerger>,
        processor: Arc<dyn SnapshotProcessor>,
    ) -> Self {
        let storage = StatsStorage::new(storage);
        let compactor = Compactor::new(storage.clone(), merger, processor);
        let queue = IngestQueue::start(Ingestor::new(storage.clone(), compactor));
        Self { storage, queue }
    }

    /// Creates a store over an existing storage implementation.
    #[cfg(test)]
    pub(crate) fn new(storage: Arc<dyn Storage>) -> Self {
        Self::assemble(storage, Arc::new(DefaultMerger), Arc::new(DefaultProcessor))
    }

    /// Submits a snapshot for ingestion and returns immediately.
    ///
    /// The bucket timestamp is validated synchronously: an unrecognized
    /// representation is rejected here, before any I/O. Everything after
    /// that — deduplication, the durable raw write, compaction — happens on
    /// the worker; a failure there is reported through tracing and does not
    /// affect other submissions. Resubmitting identical content is a
    /// successful no-op.
    pub fn submit(&self, snapshot: Snapshot) -> Result<()> {
        crate::time::Timestamp::parse(&snapshot.ts)?;
        self.queue.submit(snapshot)
    }

    /// Waits until every previously submitted snapshot has been processed.
    pub async fn flush(&self) -> Result<()> {
        self.queue.flush().await
    }

    /// Rebuilds one bucket's materialized record from its raw submissions.
    ///
    /// Normally compaction runs automatically after each accepted
    /// submission; this entry point retries it, e.g. after a compaction
    /// failure left a bucket with durable raws but a stale aggregate. The
    /// run is serialized through the ingestion queue. Returns `None` for a
    /// bucket with no submissions.
    pub async fn compact(
        &self,
        ts: impl IntoTimestamp + Send,
    ) -> Result<Option<MaterializedStats>> {
        let ts = ts.into_timestamp()?;
        self.queue.compact(ts).await
    }
}

#[async_trait]
impl StatsRead for StatsDb {
    async fn get_materialized(
        &self,
        ts: impl IntoTimestamp + Send,
    ) -> Result<Option<MaterializedStats>> {
        reader::get_materialized(&self.storage.as_read(), ts).await
    }

    async fn stream_materialized(
        &self,
        from: impl IntoTimestamp + Send,
        to: impl IntoTimestamp + Send,
    ) -> Result<MaterializedIterator> {
        reader::stream_materialized(&self.storage.as_read(), from, to).await
    }

    async fn get_metric_range(
        &self,
        kind: MetricKind,
        name: &str,
        from: impl IntoTimestamp + Send,
        to: impl IntoTimestamp + Send,
    ) -> Result<MetricIterator> {
        reader::get_metric_range(&self.storage.as_read(), kind, name, from, to).await
    }
}

#[cfg(test)]
mod tests {
    use common::StorageConfig;
    use common::storage::in_memory::InMemoryStorage;

    use super::*;
    use crate::model::MetricValue;
    use crate::reader::StatsDbReader;

    fn test_config() -> Config {
        Config {
            storage: StorageConfig::InMemory,
        }
    }

    fn snapshot_with_counter(bucket: &str, name: &str, value: f64) -> Snapshot {
        let mut snapshot = Snapshot::new(bucket);
        snapshot.counters.insert(name.to_string(), value);
        snapshot
    }

    async fn collect_ts(mut iter: MaterializedIterator) -> Vec<String> {
        let mut seen = Vec::new();
        while let Some(stats) = iter.next().await.unwrap() {
            seen.push(stats.ts);
        }
        seen
    }

    #[tokio::test]
    async fn should_open_store_with_in_memory_config() {
        // given
        let config = test_config();

        // when
        let result = StatsDb::open(config).await;

        // then
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_merge_two_submissions_into_one_bucket() {
        // given
        let db = StatsDb::open(test_config()).await.unwrap();

        // when - raw A then raw B for the same bucket, distinct content
        db.submit(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0))
            .unwrap();
        db.submit(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 3.0))
            .unwrap();
        db.flush().await.unwrap();

        // then
        let stats = db
            .get_materialized("2024-01-01T00:00:00Z")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.counters["hits"], 8.0);
    }

    #[tokio::test]
    async fn should_ingest_idempotently() {
        // given
        let db = StatsDb::open(test_config()).await.unwrap();
        let snapshot = snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0);

        // when - the same logical snapshot submitted twice
        db.submit(snapshot.clone()).unwrap();
        db.submit(snapshot).unwrap();
        db.flush().await.unwrap();

        // then - same outcome as submitting it once
        let stats = db
            .get_materialized("2024-01-01T00:00:00Z")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.counters["hits"], 5.0);
    }

    #[tokio::test]
    async fn should_merge_counters_independently_of_submission_order() {
        // given - the same three submissions in two different orders
        let values = [5.0, 3.0, 7.0];
        let forward = StatsDb::open(test_config()).await.unwrap();
        let reverse = StatsDb::open(test_config()).await.unwrap();

        // when
        for value in values {
            forward
                .submit(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", value))
                .unwrap();
        }
        for value in values.iter().rev() {
            reverse
                .submit(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", *value))
                .unwrap();
        }
        forward.flush().await.unwrap();
        reverse.flush().await.unwrap();

        // then - both equal the sum over all submissions
        let forward_stats = forward
            .get_materialized("2024-01-01T00:00:00Z")
            .await
            .unwrap()
            .unwrap();
        let reverse_stats = reverse
            .get_materialized("2024-01-01T00:00:00Z")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(forward_stats.counters["hits"], 15.0);
        assert_eq!(reverse_stats.counters["hits"], 15.0);
    }

    #[tokio::test]
    async fn should_keep_every_timer_sample_for_any_order() {
        // given
        let db = StatsDb::open(test_config()).await.unwrap();
        let sample_sets = [vec![1.0, 2.0], vec![3.0], vec![2.0, 4.0]];

        // when
        for samples in &sample_sets {
            let mut snapshot = Snapshot::new("2024-01-01T00:00:00Z");
            snapshot
                .timers
                .insert("latency".to_string(), samples.clone());
            db.submit(snapshot).unwrap();
        }
        db.flush().await.unwrap();

        // then - union with multiplicity across all submissions
        let stats = db
            .get_materialized("2024-01-01T00:00:00Z")
            .await
            .unwrap()
            .unwrap();
        let mut merged = stats.timers["latency"].clone();
        merged.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(merged, vec![1.0, 2.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.timer_stats["latency"].count, 5);
    }

    #[tokio::test]
    async fn should_return_none_for_bucket_without_submissions() {
        // given
        let db = StatsDb::open(test_config()).await.unwrap();

        // when
        let stats = db.get_materialized("2024-01-01T00:00:00Z").await.unwrap();

        // then - absent, not an error
        assert!(stats.is_none());
    }

    #[tokio::test]
    async fn should_stream_buckets_in_half_open_range() {
        // given - buckets at T0 .. T0 + 3 minutes
        let db = StatsDb::open(test_config()).await.unwrap();
        for minute in 0..4 {
            let bucket = format!("2024-01-01T00:0{}:00Z", minute);
            db.submit(snapshot_with_counter(&bucket, "hits", 1.0))
                .unwrap();
        }
        db.flush().await.unwrap();

        // when
        let iter = db
            .stream_materialized("2024-01-01T00:00:00Z", "2024-01-01T00:03:00Z")
            .await
            .unwrap();

        // then - exactly three records, the bound at `to` excluded
        assert_eq!(
            collect_ts(iter).await,
            vec![
                "2024-01-01T00:00:00Z".to_string(),
                "2024-01-01T00:01:00Z".to_string(),
                "2024-01-01T00:02:00Z".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn should_omit_buckets_without_the_queried_counter() {
        // given - bucket B lacks the "requests" counter
        let db = StatsDb::open(test_config()).await.unwrap();
        db.submit(snapshot_with_counter("2024-01-01T00:00:00Z", "requests", 4.0))
            .unwrap();
        db.submit(snapshot_with_counter("2024-01-01T00:01:00Z", "errors", 1.0))
            .unwrap();
        db.submit(snapshot_with_counter("2024-01-01T00:02:00Z", "requests", 6.0))
            .unwrap();
        db.flush().await.unwrap();

        // when
        let mut iter = db
            .get_metric_range(
                MetricKind::Counter,
                "requests",
                "2024-01-01T00:00:00Z",
                "2024-01-01T00:03:00Z",
            )
            .await
            .unwrap();
        let mut points = Vec::new();
        while let Some(point) = iter.next().await.unwrap() {
            points.push(point);
        }

        // then - bucket B is omitted, not reported as zero
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].ts, "2024-01-01T00:00:00Z");
        assert_eq!(points[0].value, MetricValue::Counter(4.0));
        assert_eq!(points[1].ts, "2024-01-01T00:02:00Z");
        assert_eq!(points[1].value, MetricValue::Counter(6.0));
    }

    #[tokio::test]
    async fn should_reject_malformed_timestamp_before_enqueue() {
        // given
        let db = StatsDb::open(test_config()).await.unwrap();

        // when
        let result = db.submit(snapshot_with_counter("last tuesday", "hits", 1.0));

        // then
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_accept_structured_time_values_in_queries() {
        // given
        use chrono::{TimeZone, Utc};
        let db = StatsDb::open(test_config()).await.unwrap();
        db.submit(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0))
            .unwrap();
        db.flush().await.unwrap();

        // when - the same bucket addressed with a chrono datetime
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let stats = db.get_materialized(at).await.unwrap();

        // then
        assert_eq!(stats.unwrap().counters["hits"], 5.0);
    }

    #[tokio::test]
    async fn should_recompact_bucket_on_demand() {
        // given
        let db = StatsDb::open(test_config()).await.unwrap();
        db.submit(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0))
            .unwrap();
        db.flush().await.unwrap();

        // when
        let stats = db.compact("2024-01-01T00:00:00Z").await.unwrap().unwrap();

        // then
        assert_eq!(stats.counters["hits"], 5.0);
    }

    #[tokio::test]
    async fn should_share_storage_with_a_reader() {
        // given - a writer and reader over the same backing storage
        let backing = Arc::new(InMemoryStorage::new());
        let db = StatsDb::new(backing.clone());
        db.submit(snapshot_with_counter("2024-01-01T00:00:00Z", "hits", 5.0))
            .unwrap();
        db.flush().await.unwrap();

        // when
        let reader = StatsDbReader::new(backing);
        let stats = reader
            .get_materialized("2024-01-01T00:00:00Z")
            .await
            .unwrap();

        // then
        assert_eq!(stats.unwrap().counters["hits"], 5.0);
    }
}
