//! Bucket compaction: folding raw submissions into one materialized record.

use std::sync::Arc;

use crate::error::Result;
use crate::merge::{SnapshotMerger, SnapshotProcessor};
use crate::model::{MaterializedStats, Snapshot};
use crate::storage::StatsStorage;
use crate::time::Timestamp;

/// Rebuilds the materialized record for a bucket from its full raw set.
///
/// Compaction never patches incrementally: every run re-scans all raw
/// submissions for the bucket and re-derives the aggregate from scratch.
/// With a deterministic merger and processor the result depends only on the
/// raw set (the fold order is fixed as ascending key order), so repeating a
/// compaction writes byte-identical output and a failed run can always be
/// retried later from the durable raw records.
pub(crate) struct Compactor {
    storage: StatsStorage,
    merger: Arc<dyn SnapshotMerger>,
    processor: Arc<dyn SnapshotProcessor>,
}

impl Compactor {
    pub(crate) fn new(
        storage: StatsStorage,
        merger: Arc<dyn SnapshotMerger>,
        processor: Arc<dyn SnapshotProcessor>,
    ) -> Self {
        Self {
            storage,
            merger,
            processor,
        }
    }

    /// Compacts one bucket.
    ///
    /// Returns the freshly written materialized record, or `None` if the
    /// bucket has no raw submissions at all (possible when invoked directly
    /// for an empty bucket; not an error).
    #[tracing::instrument(level = "debug", skip_all, fields(ts = %ts))]
    pub(crate) async fn compact(&self, ts: &Timestamp) -> Result<Option<MaterializedStats>> {
        let mut iter = self.storage.as_read().scan_raws(ts).await?;

        let mut acc: Option<Snapshot> = None;
        while let Some(raw) = iter.next().await? {
            acc = Some(match acc {
                None => raw,
                Some(merged) => self.merger.merge(ts, merged, raw),
            });
        }

        let Some(merged) = acc else {
            return Ok(None);
        };

        let stats = self.processor.process(merged);
        self.storage.write_materialized(&stats).await?;
        Ok(Some(stats))
    }
}
