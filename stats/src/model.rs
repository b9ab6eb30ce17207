//! Core data types for the stats store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One collector's report for one time bucket.
///
/// Snapshots are written once, never mutated, and retained indefinitely. A
/// snapshot is identified by its bucket timestamp plus a fingerprint of its
/// canonical serialization; resubmitting identical content is a no-op.
///
/// Maps are ordered so that serialization is canonical: two snapshots with
/// the same logical content always serialize to the same bytes, and
/// therefore the same fingerprint.
///
/// # Example
///
/// ```
/// use stats::Snapshot;
///
/// let mut snapshot = Snapshot::new("2024-01-01T00:00:00Z");
/// snapshot.counters.insert("requests".to_string(), 42.0);
/// snapshot.timers.insert("latency_ms".to_string(), vec![1.5, 3.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Bucket timestamp. Normalized to canonical RFC 3339 UTC form during
    /// ingestion; the bucket granularity is whatever the submitting
    /// collector chose when rounding.
    pub ts: String,

    /// Hostname of the submitting collector, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Process ID of the submitting collector, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Counter deltas by metric name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, f64>,

    /// Timer sample collections by metric name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub timers: BTreeMap<String, Vec<f64>>,

    /// Instantaneous gauge values by metric name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gauges: BTreeMap<String, f64>,
}

impl Snapshot {
    /// Creates an empty snapshot for the given bucket timestamp.
    pub fn new(ts: impl Into<String>) -> Self {
        Self {
            ts: ts.into(),
            host: None,
            pid: None,
            counters: BTreeMap::new(),
            timers: BTreeMap::new(),
            gauges: BTreeMap::new(),
        }
    }

    /// Serializes the snapshot to its canonical byte form.
    ///
    /// Struct fields serialize in declaration order, map entries in key
    /// order, and empty maps are skipped, so logically identical snapshots
    /// produce identical bytes. Fingerprints are computed over these bytes
    /// and these bytes are what gets stored.
    pub(crate) fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Encoding(format!("invalid raw submission record: {}", e)))
    }
}

/// Derived statistics for one timer metric, computed by the post-processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerStats {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

/// The canonical aggregate for one time bucket.
///
/// At most one materialized record exists per bucket. It is fully rebuilt
/// from the complete raw set every time a new submission for the bucket is
/// accepted, so it is always consistent with everything known, never
/// partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedStats {
    /// Bucket timestamp in canonical form.
    pub ts: String,

    /// Merged counter totals by metric name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, f64>,

    /// Merged timer samples by metric name (union across submissions).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub timers: BTreeMap<String, Vec<f64>>,

    /// Merged gauge values by metric name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gauges: BTreeMap<String, f64>,

    /// Post-processor output: per-timer summary statistics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub timer_stats: BTreeMap<String, TimerStats>,
}

impl MaterializedStats {
    /// Serializes to the stored byte form. Deterministic for a given value,
    /// so recompacting an unchanged raw set rewrites identical bytes.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Encoding(format!("invalid materialized record: {}", e)))
    }
}

/// The class of a metric, selecting which field map a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Timer,
    Gauge,
}

impl std::str::FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "counter" => Ok(MetricKind::Counter),
            "timer" => Ok(MetricKind::Timer),
            "gauge" => Ok(MetricKind::Gauge),
            other => Err(Error::InvalidInput(format!(
                "unknown metric kind '{}', expected counter, timer, or gauge",
                other
            ))),
        }
    }
}

/// The value of one metric in one bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(f64),
    Timer(Vec<f64>),
    Gauge(f64),
}

/// One point in a metric's time series.
///
/// Buckets that lack the queried metric contribute no point at all; absence
/// is never reported as a zero value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    /// Bucket timestamp in canonical form.
    pub ts: String,
    /// The metric's value in that bucket.
    pub value: MetricValue,
}
