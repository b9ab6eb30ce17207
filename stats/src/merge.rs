//! Merge and post-processing seams.
//!
//! The store does not define how two snapshots combine numerically, or which
//! derived statistics a materialized record carries. Both are consumed
//! capabilities expressed as traits, with default implementations that match
//! the conventional semantics of counters, timers, and gauges.

use std::collections::BTreeMap;

use crate::model::{MaterializedStats, Snapshot, TimerStats};
use crate::time::Timestamp;

/// Combines two snapshots of the same bucket into one.
///
/// Required behavior per field class, so that the compactor's fold is
/// correct in any order:
///
/// - counters: associative numeric combination (order-independent);
/// - timers: non-destructive combination of sample collections, so
///   downstream percentile computation sees every sample;
/// - gauges: either operand's value may win. Gauges are point-in-time
///   measurements from possibly-different hosts with no causal ordering
///   between them; callers may only rely on "some submitted gauge value for
///   the bucket survives."
pub trait SnapshotMerger: Send + Sync {
    fn merge(&self, ts: &Timestamp, acc: Snapshot, next: Snapshot) -> Snapshot;
}

/// Derives post-merge statistics from a fully merged snapshot.
///
/// Pure function, no I/O. Must be deterministic: compacting an unchanged
/// raw set twice writes byte-identical materialized records.
pub trait SnapshotProcessor: Send + Sync {
    fn process(&self, snapshot: Snapshot) -> MaterializedStats;
}

/// Default merge semantics: counters sum, timer samples concatenate, and the
/// later fold operand's gauge value wins.
#[derive(Debug, Default)]
pub struct DefaultMerger;

impl SnapshotMerger for DefaultMerger {
    fn merge(&self, ts: &Timestamp, mut acc: Snapshot, next: Snapshot) -> Snapshot {
        for (name, delta) in next.counters {
            *acc.counters.entry(name).or_insert(0.0) += delta;
        }
        for (name, samples) in next.timers {
            acc.timers.entry(name).or_default().extend(samples);
        }
        for (name, value) in next.gauges {
            acc.gauges.insert(name, value);
        }
        // The accumulator describes the whole bucket, not one collector.
        acc.ts = ts.as_str().to_string();
        acc.host = None;
        acc.pid = None;
        acc
    }
}

/// Default post-processor: summarizes each timer's merged sample collection.
#[derive(Debug, Default)]
pub struct DefaultProcessor;

impl SnapshotProcessor for DefaultProcessor {
    fn process(&self, snapshot: Snapshot) -> MaterializedStats {
        let timer_stats: BTreeMap<String, TimerStats> = snapshot
            .timers
            .iter()
            .filter_map(|(name, samples)| {
                summarize(samples).map(|stats| (name.clone(), stats))
            })
            .collect();

        MaterializedStats {
            ts: snapshot.ts,
            counters: snapshot.counters,
            timers: snapshot.timers,
            gauges: snapshot.gauges,
            timer_stats,
        }
    }
}

fn summarize(samples: &[f64]) -> Option<TimerStats> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len() as u64;
    let sum: f64 = sorted.iter().sum();

    Some(TimerStats {
        count,
        sum,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean: sum / count as f64,
        p50: percentile(&sorted, 50.0),
        p90: percentile(&sorted, 90.0),
        p99: percentile(&sorted, 99.0),
    })
}

/// Nearest-rank percentile over an ascending sample list.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.max(1) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn bucket() -> Timestamp {
        ts("2024-01-01T00:00:00Z")
    }

    #[test]
    fn should_sum_counters() {
        // given
        let mut a = Snapshot::new("2024-01-01T00:00:00Z");
        a.counters.insert("hits".to_string(), 5.0);
        let mut b = Snapshot::new("2024-01-01T00:00:00Z");
        b.counters.insert("hits".to_string(), 3.0);
        b.counters.insert("errors".to_string(), 1.0);

        // when
        let merged = DefaultMerger.merge(&bucket(), a, b);

        // then
        assert_eq!(merged.counters["hits"], 8.0);
        assert_eq!(merged.counters["errors"], 1.0);
    }

    #[test]
    fn should_concatenate_timer_samples() {
        // given
        let mut a = Snapshot::new("2024-01-01T00:00:00Z");
        a.timers.insert("latency".to_string(), vec![1.0, 2.0]);
        let mut b = Snapshot::new("2024-01-01T00:00:00Z");
        b.timers.insert("latency".to_string(), vec![3.0]);

        // when
        let merged = DefaultMerger.merge(&bucket(), a, b);

        // then
        assert_eq!(merged.timers["latency"], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn should_keep_one_gauge_value() {
        // given
        let mut a = Snapshot::new("2024-01-01T00:00:00Z");
        a.gauges.insert("mem".to_string(), 100.0);
        let mut b = Snapshot::new("2024-01-01T00:00:00Z");
        b.gauges.insert("mem".to_string(), 200.0);

        // when
        let merged = DefaultMerger.merge(&bucket(), a, b);

        // then - the surviving value came from one of the operands
        assert_eq!(merged.gauges["mem"], 200.0);
    }

    #[test]
    fn should_clear_collector_identity_after_merge() {
        // given
        let mut a = Snapshot::new("2024-01-01T00:00:00Z");
        a.host = Some("web-1".to_string());
        a.pid = Some(100);
        let mut b = Snapshot::new("2024-01-01T00:00:00Z");
        b.host = Some("web-2".to_string());
        b.pid = Some(200);

        // when
        let merged = DefaultMerger.merge(&bucket(), a, b);

        // then
        assert!(merged.host.is_none());
        assert!(merged.pid.is_none());
    }

    #[test]
    fn should_summarize_timers_in_processed_output() {
        // given
        let mut snapshot = Snapshot::new("2024-01-01T00:00:00Z");
        snapshot
            .timers
            .insert("latency".to_string(), vec![4.0, 1.0, 3.0, 2.0]);

        // when
        let stats = DefaultProcessor.process(snapshot);

        // then
        let latency = &stats.timer_stats["latency"];
        assert_eq!(latency.count, 4);
        assert_eq!(latency.sum, 10.0);
        assert_eq!(latency.min, 1.0);
        assert_eq!(latency.max, 4.0);
        assert_eq!(latency.mean, 2.5);
        assert_eq!(latency.p50, 2.0);
    }

    #[test]
    fn should_carry_merged_fields_through_processing() {
        // given
        let mut snapshot = Snapshot::new("2024-01-01T00:00:00Z");
        snapshot.counters.insert("hits".to_string(), 8.0);
        snapshot.gauges.insert("mem".to_string(), 42.0);

        // when
        let stats = DefaultProcessor.process(snapshot);

        // then
        assert_eq!(stats.ts, "2024-01-01T00:00:00Z");
        assert_eq!(stats.counters["hits"], 8.0);
        assert_eq!(stats.gauges["mem"], 42.0);
        assert!(stats.timer_stats.is_empty());
    }

    #[test]
    fn should_compute_nearest_rank_percentiles() {
        // given
        let sorted: Vec<f64> = (1..=100).map(|v| v as f64).collect();

        // then
        assert_eq!(percentile(&sorted, 50.0), 50.0);
        assert_eq!(percentile(&sorted, 90.0), 90.0);
        assert_eq!(percentile(&sorted, 99.0), 99.0);
    }
}
