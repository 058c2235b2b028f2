//! Prometheus metrics for the KIS client.
//!
//! Covers:
//! - Dispatch outcomes per transaction id
//! - HTTP round-trip latency
//! - Hash-key signing degradation
//! - Authentication failures during session construction
//! - Bulk-cancel row outcomes
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a startup bug. These panics only occur
//! during static initialization, never at runtime.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// How a dispatched call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
    /// HTTP 200 with success code "0".
    Ok,
    /// HTTP 200 with any other success code.
    LogicalFailure,
    /// Non-200 HTTP status.
    HttpStatus,
    /// Connection, DNS, timeout or body read failure.
    Transport,
    /// Hash-key unavailable under the strict signing policy.
    SigningFailed,
}

impl DispatchOutcome {
    pub const ALL: [DispatchOutcome; 5] = [
        Self::Ok,
        Self::LogicalFailure,
        Self::HttpStatus,
        Self::Transport,
        Self::SigningFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::LogicalFailure => "logical_failure",
            Self::HttpStatus => "http_status",
            Self::Transport => "transport",
            Self::SigningFailed => "signing_failed",
        }
    }
}

/// Dispatched calls by outcome.
/// Labels: outcome, tr_id
pub static DISPATCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kis_dispatch_total",
        "Total dispatched API calls by outcome",
        &["outcome", "tr_id"]
    )
    .unwrap()
});

/// HTTP round-trip latency in milliseconds.
pub static REQUEST_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "kis_request_latency_ms",
        "HTTP round-trip latency in milliseconds",
        &["method"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 10000.0]
    )
    .unwrap()
});

/// Mutating calls that went out without a hash-key.
pub static HASHKEY_DEGRADED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kis_hashkey_degraded_total",
        "Mutating calls sent without a hash-key",
        &["tr_id"]
    )
    .unwrap()
});

/// Authentication exchange failures.
/// Labels: stage (token/approval)
pub static AUTH_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kis_auth_failures_total",
        "Failed credential exchanges during session construction",
        &["stage"]
    )
    .unwrap()
});

/// Sessions established per environment.
pub static SESSIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kis_sessions_total",
        "Sessions established",
        &["env"]
    )
    .unwrap()
});

/// Bulk-cancel rows by outcome.
/// Labels: market, outcome (skipped/accepted/rejected/no_response)
pub static BULK_CANCEL_ROWS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kis_bulk_cancel_rows_total",
        "Outstanding-order rows handled by bulk cancellation",
        &["market", "outcome"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record the outcome of a dispatched call.
    pub fn dispatch(outcome: DispatchOutcome, tr_id: &str) {
        DISPATCH_TOTAL
            .with_label_values(&[outcome.as_str(), tr_id])
            .inc();
    }

    /// Record HTTP round-trip latency.
    pub fn request_latency(method: &str, latency_ms: f64) {
        REQUEST_LATENCY_MS
            .with_label_values(&[method])
            .observe(latency_ms);
    }

    /// Record a mutating call sent without a hash-key.
    pub fn hashkey_degraded(tr_id: &str) {
        HASHKEY_DEGRADED_TOTAL.with_label_values(&[tr_id]).inc();
    }

    pub fn auth_failure(stage: &str) {
        AUTH_FAILURES_TOTAL.with_label_values(&[stage]).inc();
    }

    pub fn session_established(env: &str) {
        SESSIONS_TOTAL.with_label_values(&[env]).inc();
    }

    /// Record one bulk-cancel row.
    pub fn bulk_cancel_row(market: &str, outcome: &str) {
        BULK_CANCEL_ROWS_TOTAL
            .with_label_values(&[market, outcome])
            .inc();
    }

    /// Text exposition of every registered metric.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
