//! Minimum-gap request pacing.
//!
//! Enforces a fixed pause between consecutive calls so sequential loops
//! stay under the upstream's per-second limit. Shared safely across tasks.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

/// Pause used between bulk-cancel requests.
pub const DEFAULT_CANCEL_PAUSE: Duration = Duration::from_millis(20);

pub struct RequestPacer {
    min_gap: Duration,
    last: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last: Mutex::new(None),
        }
    }

    /// Time left before the next call may start.
    pub fn remaining(&self) -> Duration {
        match *self.last.lock() {
            Some(last) => (last + self.min_gap).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Wait until the gap since the previous call has elapsed.
    pub async fn ready(&self) {
        let wait = self.remaining();
        if !wait.is_zero() {
            trace!(wait_ms = wait.as_millis() as u64, "Pacing request");
            tokio::time::sleep(wait).await;
        }
    }

    /// Mark a call as finished.
    pub fn record(&self) {
        *self.last.lock() = Some(Instant::now());
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_CANCEL_PAUSE)
    }
}
