//! Prometheus metrics and structured logging for the KIS client.
//!
//! - Prometheus counters for dispatch outcomes, signing degradation,
//!   authentication failures and bulk-cancel rows
//! - Structured logging with tracing (JSON in production)
//! - End-of-run session summary built from the collected metrics

pub mod error;
pub mod logging;
pub mod metrics;
pub mod session_stats;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{DispatchOutcome, Metrics};
pub use session_stats::{SessionStats, SessionStatsReporter};
