//! Stats - a durable time-bucketed metrics store built on ordered storage.
//!
//! Independent collectors periodically submit snapshots of counters, timers,
//! and gauges tagged with a bucket timestamp. The store retains every
//! distinct submission durably, deduplicates identical resubmissions by
//! content fingerprint, folds each bucket's submissions into one canonical
//! aggregate, and serves time range queries over the result.
//!
//! # Architecture
//!
//! Records live in an ordered key-value store (the `common` crate's
//! `Storage` capability, backed by SlateDB or memory). Raw submissions are
//! keyed by `(bucket timestamp, content fingerprint)` and materialized
//! aggregates by timestamp alone; canonical fixed-width timestamps make the
//! key order chronological, so a bucket's submissions and any time range of
//! aggregates are each one contiguous scan.
//!
//! A single worker task owned by each [`StatsDb`] serializes the write
//! path: every accepted submission is durably stored, then its bucket's
//! aggregate is fully rebuilt from all raw submissions. Rebuilding from
//! scratch keeps the aggregate consistent with everything known and makes
//! compaction idempotent and safe to retry.
//!
//! # Key Concepts
//!
//! - **[`StatsDb`]**: the main entry point, owning the ingestion queue and
//!   providing reads via [`StatsRead`].
//! - **[`StatsDbReader`]**: a read-only view for consumers that must not
//!   submit.
//! - **[`SnapshotMerger`] / [`SnapshotProcessor`]**: the numeric merge and
//!   statistics derivation seams; defaults provided.
//!
//! # Example
//!
//! ```ignore
//! use stats::{Config, Snapshot, StatsDb, StatsRead};
//!
//! let db = StatsDb::open(Config::default()).await?;
//!
//! let mut snapshot = Snapshot::new("2024-01-01T00:00:00Z");
//! snapshot.counters.insert("requests".to_string(), 42.0);
//! snapshot.timers.insert("latency_ms".to_string(), vec![3.1, 5.6]);
//! db.submit(snapshot)?;
//! db.flush().await?;
//!
//! let mut iter = db
//!     .stream_materialized("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z")
//!     .await?;
//! while let Some(stats) = iter.next().await? {
//!     println!("{}: {:?}", stats.ts, stats.counters);
//! }
//! ```

mod compact;
mod config;
mod error;
mod fingerprint;
mod ingest;
mod merge;
mod model;
mod queue;
mod reader;
mod serde;
mod storage;
mod store;
mod time;

pub use config::Config;
pub use error::{Error, Result};
pub use merge::{DefaultMerger, DefaultProcessor, SnapshotMerger, SnapshotProcessor};
pub use model::{
    MaterializedStats, MetricKind, MetricPoint, MetricValue, Snapshot, TimerStats,
};
pub use reader::{MaterializedIterator, MetricIterator, StatsDbReader, StatsRead};
pub use store::StatsDb;
pub use time::{IntoTimestamp, Timestamp};
