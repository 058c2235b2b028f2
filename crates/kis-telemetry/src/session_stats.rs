//! End-of-run summary of the collected metrics.
//!
//! Aggregates the counters across their `tr_id` / `market` labels so a CLI
//! run can log one compact summary:
//! - dispatch outcomes
//! - unsigned mutating calls
//! - bulk-cancel rows
//! - mean round-trip latency

use crate::metrics::{
    DispatchOutcome, BULK_CANCEL_ROWS_TOTAL, DISPATCH_TOTAL, HASHKEY_DEGRADED_TOTAL,
    REQUEST_LATENCY_MS,
};
use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Aggregated statistics since the reporter was created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    pub dispatch: BTreeMap<String, u64>,
    pub unsigned_orders: u64,
    pub bulk_cancel_rows: BTreeMap<String, u64>,
    pub latency_samples: u64,
    pub mean_latency_ms: f64,
}

impl SessionStats {
    pub fn total_calls(&self) -> u64 {
        self.dispatch.values().sum()
    }
}

/// Histogram totals across all labels.
#[derive(Debug, Clone, Copy, Default)]
struct LatencyTotals {
    sum_ms: f64,
    count: u64,
}

impl LatencyTotals {
    fn since(&self, base: &Self) -> Self {
        Self {
            sum_ms: (self.sum_ms - base.sum_ms).max(0.0),
            count: self.count.saturating_sub(base.count),
        }
    }

    fn mean(&self) -> f64 {
        if self.count > 0 {
            self.sum_ms / self.count as f64
        } else {
            0.0
        }
    }
}

/// Session statistics reporter.
pub struct SessionStatsReporter {
    start_time: DateTime<Utc>,
    baseline: SessionStats,
    baseline_latency: LatencyTotals,
}

impl SessionStatsReporter {
    /// Start counting from the current metric values.
    pub fn new() -> Self {
        let (baseline, baseline_latency) = snapshot();
        Self {
            start_time: Utc::now(),
            baseline,
            baseline_latency,
        }
    }

    /// Statistics accumulated since `new`.
    pub fn get_stats(&self) -> SessionStats {
        let (now, latency) = snapshot();
        let latency = latency.since(&self.baseline_latency);
        SessionStats {
            dispatch: diff(&now.dispatch, &self.baseline.dispatch),
            unsigned_orders: now
                .unsigned_orders
                .saturating_sub(self.baseline.unsigned_orders),
            bulk_cancel_rows: diff(&now.bulk_cancel_rows, &self.baseline.bulk_cancel_rows),
            latency_samples: latency.count,
            mean_latency_ms: latency.mean(),
        }
    }

    /// Output the summary to logs.
    pub fn output_summary(&self) {
        let stats = self.get_stats();
        let elapsed = Utc::now() - self.start_time;

        info!(
            started = %self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            elapsed_ms = elapsed.num_milliseconds(),
            calls = stats.total_calls(),
            "Session summary"
        );
        for (outcome, count) in &stats.dispatch {
            info!(outcome = %outcome, count, "  dispatch");
        }
        if stats.unsigned_orders > 0 {
            info!(count = stats.unsigned_orders, "  orders sent without hash-key");
        }
        for (outcome, count) in &stats.bulk_cancel_rows {
            info!(outcome = %outcome, count, "  bulk-cancel rows");
        }
        info!(
            samples = stats.latency_samples,
            mean_latency_ms = format!("{:.1}", stats.mean_latency_ms),
            "  latency"
        );
    }
}

impl Default for SessionStatsReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot() -> (SessionStats, LatencyTotals) {
    let mut dispatch: BTreeMap<String, u64> = DispatchOutcome::ALL
        .iter()
        .map(|o| (o.as_str().to_string(), 0))
        .collect();
    sum_counter_by_label(&DISPATCH_TOTAL, "outcome", &mut dispatch);

    let mut bulk_cancel_rows = BTreeMap::new();
    sum_counter_by_label(&BULK_CANCEL_ROWS_TOTAL, "outcome", &mut bulk_cancel_rows);

    let mut unsigned = BTreeMap::new();
    sum_counter_by_label(&HASHKEY_DEGRADED_TOTAL, "tr_id", &mut unsigned);

    let latency = histogram_totals(&REQUEST_LATENCY_MS);
    let stats = SessionStats {
        dispatch,
        unsigned_orders: unsigned.values().sum(),
        bulk_cancel_rows,
        latency_samples: latency.count,
        mean_latency_ms: latency.mean(),
    };
    (stats, latency)
}

/// Sum counter values grouped by one label.
fn sum_counter_by_label(
    counter: &prometheus::CounterVec,
    label: &str,
    into: &mut BTreeMap<String, u64>,
) {
    for mf in counter.collect() {
        for m in mf.get_metric() {
            let Some(pair) = m.get_label().iter().find(|p| p.get_name() == label) else {
                continue;
            };
            *into.entry(pair.get_value().to_string()).or_default() +=
                m.get_counter().get_value() as u64;
        }
    }
}

fn histogram_totals(histogram: &prometheus::HistogramVec) -> LatencyTotals {
    let mut totals = LatencyTotals::default();
    for mf in histogram.collect() {
        for m in mf.get_metric() {
            let h = m.get_histogram();
            totals.sum_ms += h.get_sample_sum();
            totals.count += h.get_sample_count();
        }
    }
    totals
}

fn diff(now: &BTreeMap<String, u64>, base: &BTreeMap<String, u64>) -> BTreeMap<String, u64> {
    now.iter()
        .map(|(k, v)| (k.clone(), v.saturating_sub(base.get(k).copied().unwrap_or(0))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;

    #[test]
    fn test_stats_count_from_baseline() {
        let reporter = SessionStatsReporter::new();
        Metrics::dispatch(DispatchOutcome::HttpStatus, "STATS001R");
        Metrics::dispatch(DispatchOutcome::HttpStatus, "STATS002R");
        Metrics::bulk_cancel_row("overseas", "accepted");

        let stats = reporter.get_stats();
        // Other tests share the global registry, so only lower bounds hold.
        assert!(stats.dispatch["http_status"] >= 2);
        assert!(stats.bulk_cancel_rows["accepted"] >= 1);
        assert!(stats.total_calls() >= 2);
    }

    #[test]
    fn test_latency_mean_ignores_samples_before_baseline() {
        Metrics::request_latency("GET", 9_000.0);
        let reporter = SessionStatsReporter::new();
        Metrics::request_latency("GET", 10.0);
        Metrics::request_latency("POST", 30.0);

        let stats = reporter.get_stats();
        assert_eq!(stats.latency_samples, 2);
        assert!((stats.mean_latency_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = SessionStatsReporter::new().get_stats();
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["dispatch"].get("ok").is_some());
    }
}
