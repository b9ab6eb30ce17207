//! Read-only stats access and the [`StatsRead`] trait.
//!
//! This module provides:
//! - [`StatsRead`]: The trait defining read operations on the store.
//! - [`StatsDbReader`]: A read-only view that implements `StatsRead`.
//! - [`MaterializedIterator`] / [`MetricIterator`]: streaming cursors over
//!   range queries.
//!
//! Reads are not serialized against the ingestion queue: a reader racing a
//! compaction observes either the previous or the new materialized record
//! (single-key puts), never a partial one.

use std::sync::Arc;

use async_trait::async_trait;
use common::{StorageIterator, StorageRead};
use common::storage::factory::create_storage;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{MaterializedStats, MetricKind, MetricPoint, MetricValue};
use crate::storage::StatsStorageRead;
use crate::time::IntoTimestamp;

/// Trait for read operations on the stats store.
///
/// Implemented by [`StatsDb`](crate::StatsDb) and [`StatsDbReader`], so
/// query code can work against either. Time arguments accept anything
/// implementing [`IntoTimestamp`]; unrecognized time representations fail
/// before any I/O. Absent data is `None` or an empty sequence, never an
/// error.
#[async_trait]
pub trait StatsRead {
    /// Fetches the materialized aggregate for one bucket.
    ///
    /// Returns `None` for a bucket with no accepted submissions.
    async fn get_materialized(
        &self,
        ts: impl IntoTimestamp + Send,
    ) -> Result<Option<MaterializedStats>>;

    /// Streams materialized records over `[from, to)` in chronological
    /// order.
    ///
    /// Each call opens an independent, restartable scan; records are yielded
    /// as the scan progresses. A `from` at or past `to` yields an empty
    /// sequence without touching storage.
    async fn stream_materialized(
        &self,
        from: impl IntoTimestamp + Send,
        to: impl IntoTimestamp + Send,
    ) -> Result<MaterializedIterator>;

    /// Extracts one named metric's time series over `[from, to)`.
    ///
    /// Buckets whose corresponding field map lacks `name` are omitted
    /// entirely; absence is not reported as zero. Points arrive at stored
    /// bucket granularity; no interval re-bucketing is performed.
    async fn get_metric_range(
        &self,
        kind: MetricKind,
        name: &str,
        from: impl IntoTimestamp + Send,
        to: impl IntoTimestamp + Send,
    ) -> Result<MetricIterator>;
}

/// A read-only view of a stats store.
///
/// Useful for consumers that should not be able to submit, and for serving
/// queries from a component that does not own the ingestion queue.
pub struct StatsDbReader {
    storage: StatsStorageRead,
}

impl StatsDbReader {
    /// Opens a read-only view with the given configuration.
    pub async fn open(config: Config) -> Result<Self> {
        let storage = create_storage(&config.storage)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(Self {
            storage: StatsStorageRead::new(storage as Arc<dyn StorageRead>),
        })
    }

    /// Creates a reader over an existing storage implementation.
    #[cfg(test)]
    pub(crate) fn new(storage: Arc<dyn StorageRead>) -> Self {
        Self {
            storage: StatsStorageRead::new(storage),
        }
    }
}

#[async_trait]
impl StatsRead for StatsDbReader {
    async fn get_materialized(
        &self,
        ts: impl IntoTimestamp + Send,
    ) -> Result<Option<MaterializedStats>> {
        get_materialized(&self.storage, ts).await
    }

    async fn stream_materialized(
        &self,
        from: impl IntoTimestamp + Send,
        to: impl IntoTimestamp + Send,
    ) -> Result<MaterializedIterator> {
        stream_materialized(&self.storage, from, to).await
    }

    async fn get_metric_range(
        &self,
        kind: MetricKind,
        name: &str,
        from: impl IntoTimestamp + Send,
        to: impl IntoTimestamp + Send,
    ) -> Result<MetricIterator> {
        get_metric_range(&self.storage, kind, name, from, to).await
    }
}

pub(crate) async fn get_materialized(
    storage: &StatsStorageRead,
    ts: impl IntoTimestamp + Send,
) -> Result<Option<MaterializedStats>> {
    let ts = ts.into_timestamp()?;
    storage.get_materialized(&ts).await
}

pub(crate) async fn stream_materialized(
    storage: &StatsStorageRead,
    from: impl IntoTimestamp + Send,
    to: impl IntoTimestamp + Send,
) -> Result<MaterializedIterator> {
    let from = from.into_timestamp()?;
    let to = to.into_timestamp()?;
    if from >= to {
        return Ok(MaterializedIterator { inner: None });
    }
    let inner = storage.scan_materialized(&from, &to).await?;
    Ok(MaterializedIterator { inner: Some(inner) })
}

pub(crate) async fn get_metric_range(
    storage: &StatsStorageRead,
    kind: MetricKind,
    name: &str,
    from: impl IntoTimestamp + Send,
    to: impl IntoTimestamp + Send,
) -> Result<MetricIterator> {
    let inner = stream_materialized(storage, from, to).await?;
    Ok(MetricIterator {
        inner,
        kind,
        name: name.to_string(),
    })
}

/// Streaming cursor over materialized records in a time range.
pub struct MaterializedIterator {
    inner: Option<Box<dyn StorageIterator + Send>>,
}

impl MaterializedIterator {
    /// Returns the next materialized record in chronological order, or
    /// `None` when the range is exhausted.
    ///
    /// A storage failure mid-scan surfaces here as an error; the sequence
    /// never silently ends early.
    pub async fn next(&mut self) -> Result<Option<MaterializedStats>> {
        let Some(inner) = &mut self.inner else {
            return Ok(None);
        };
        match inner.next().await? {
            Some(record) => Ok(Some(MaterializedStats::from_bytes(&record.value)?)),
            None => Ok(None),
        }
    }
}

/// Streaming cursor over one metric's time series.
pub struct MetricIterator {
    inner: MaterializedIterator,
    kind: MetricKind,
    name: String,
}

impl MetricIterator {
    /// Returns the next point, skipping buckets that lack the metric.
    pub async fn next(&mut self) -> Result<Option<MetricPoint>> {
        loop {
            let Some(stats) = self.inner.next().await? else {
                return Ok(None);
            };
            if let Some(value) = extract(&stats, self.kind, &self.name) {
                return Ok(Some(MetricPoint {
                    ts: stats.ts,
                    value,
                }));
            }
        }
    }
}

fn extract(stats: &MaterializedStats, kind: MetricKind, name: &str) -> Option<MetricValue> {
    match kind {
        MetricKind::Counter => stats.counters.get(name).copied().map(MetricValue::Counter),
        MetricKind::Timer => stats.timers.get(name).cloned().map(MetricValue::Timer),
        MetricKind::Gauge => stats.gauges.get(name).copied().map(MetricValue::Gauge),
    }
}
