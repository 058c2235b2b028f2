//! Rate-gated "cancel every outstanding order" loop.
//!
//! States: `Fetching` → `Iterating` → `Done`. No retries; a failed row
//! never halts the loop. Rows whose instrument code is in the skip set are
//! left alone. Consecutive cancellation requests are separated by a fixed
//! pause. Every row's outcome is logged and collected into the report.

use crate::envelope::{ApiFailure, ResponseEnvelope};
use crate::models::{OutstandingOrder, OverseasOrder};
use crate::pacer::RequestPacer;
use kis_core::Market;
use kis_telemetry::Metrics;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkCancelState {
    Fetching,
    Iterating,
    Done,
}

/// A listed order the loop can cancel.
pub trait CancelTarget {
    fn order_id(&self) -> &str;
    fn instrument_code(&self) -> &str;
}

impl CancelTarget for OutstandingOrder {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn instrument_code(&self) -> &str {
        &self.code
    }
}

impl CancelTarget for OverseasOrder {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn instrument_code(&self) -> &str {
        &self.code
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CancelResult {
    Accepted,
    Rejected { code: String, message: String },
    /// Transport failure or non-200 status.
    NoResponse,
}

impl CancelResult {
    pub fn from_envelope(envelope: Option<ResponseEnvelope>) -> Self {
        match envelope.map(ResponseEnvelope::into_result) {
            Some(Ok(_)) => Self::Accepted,
            Some(Err(ApiFailure { code, message })) => Self::Rejected { code, message },
            None => Self::NoResponse,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::NoResponse => "no_response",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelOutcome {
    pub order_id: String,
    pub code: String,
    #[serde(flatten)]
    pub result: CancelResult,
}

/// Aggregate result of one bulk-cancel run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkCancelReport {
    pub market: Market,
    pub state: BulkCancelState,
    pub listed: usize,
    pub skipped: usize,
    pub outcomes: Vec<CancelOutcome>,
}

impl BulkCancelReport {
    fn new(market: Market) -> Self {
        Self {
            market,
            state: BulkCancelState::Fetching,
            listed: 0,
            skipped: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.result == CancelResult::Accepted)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }
}

/// Run the loop over an already fetched listing.
///
/// `None` or an empty listing ends in `Done` with nothing attempted.
/// `cancel` issues one cancellation and returns the raw dispatch result.
pub async fn cancel_each<O, F, Fut>(
    market: Market,
    listing: Option<Vec<O>>,
    skip_codes: &[String],
    pause: Duration,
    mut cancel: F,
) -> BulkCancelReport
where
    O: CancelTarget,
    F: FnMut(O) -> Fut,
    Fut: Future<Output = Option<ResponseEnvelope>>,
{
    let mut report = BulkCancelReport::new(market);
    let market_label = market.to_string();

    let rows = match listing {
        Some(rows) if !rows.is_empty() => rows,
        _ => {
            debug!(%market, "No outstanding orders to cancel");
            report.state = BulkCancelState::Done;
            return report;
        }
    };

    report.listed = rows.len();
    report.state = BulkCancelState::Iterating;
    let pacer = RequestPacer::new(pause);

    for row in rows {
        let order_id = row.order_id().to_string();
        let code = row.instrument_code().to_string();

        if skip_codes.iter().any(|s| *s == code) {
            debug!(%market, order_id = %order_id, code = %code, "Skipping excluded instrument");
            report.skipped += 1;
            Metrics::bulk_cancel_row(&market_label, "skipped");
            continue;
        }

        pacer.ready().await;
        let result = CancelResult::from_envelope(cancel(row).await);
        pacer.record();

        match &result {
            CancelResult::Accepted => {
                info!(%market, order_id = %order_id, code = %code, "Cancel accepted")
            }
            CancelResult::Rejected {
                code: error_code,
                message,
            } => info!(
                %market,
                order_id = %order_id,
                code = %code,
                error_code = %error_code,
                error_message = %message,
                "Cancel rejected"
            ),
            CancelResult::NoResponse => {
                warn!(%market, order_id = %order_id, code = %code, "Cancel got no response")
            }
        }
        Metrics::bulk_cancel_row(&market_label, result.label());
        report.outcomes.push(CancelOutcome {
            order_id,
            code,
            result,
        });
    }

    report.state = BulkCancelState::Done;
    info!(
        %market,
        listed = report.listed,
        skipped = report.skipped,
        attempted = report.attempted(),
        succeeded = report.succeeded(),
        "Bulk cancel finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Instant;

    fn order(id: &str, code: &str) -> OutstandingOrder {
        serde_json::from_value(json!({"odno": id, "pdno": code, "ord_qty": "1", "ord_unpr": "100"}))
            .unwrap()
    }

    fn accepted() -> Option<ResponseEnvelope> {
        Some(ResponseEnvelope::from_json(json!({"rt_cd": "0", "msg1": "done"})))
    }

    #[tokio::test]
    async fn test_skips_excluded_codes_and_cancels_the_rest() {
        let rows = vec![
            order("1", "005930"),
            order("2", "000660"),
            order("3", "005930"),
            order("4", "035420"),
        ];
        let skip = vec!["005930".to_string()];
        let seen = Mutex::new(Vec::new());

        let report = cancel_each(Market::Domestic, Some(rows), &skip, Duration::ZERO, |o| {
            seen.lock().push(o.order_id.clone());
            async { accepted() }
        })
        .await;

        assert_eq!(*seen.lock(), vec!["2", "4"]);
        assert_eq!(report.listed, 4);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.attempted(), 2);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.state, BulkCancelState::Done);
    }

    #[tokio::test]
    async fn test_failures_do_not_halt_the_loop() {
        let rows = vec![order("1", "A"), order("2", "B"), order("3", "C")];
        let mut calls = 0;

        let report = cancel_each(Market::Domestic, Some(rows), &[], Duration::ZERO, |_| {
            calls += 1;
            let reply = match calls {
                1 => None,
                2 => Some(ResponseEnvelope::from_json(
                    json!({"rt_cd": "1", "msg1": "already filled"}),
                )),
                _ => accepted(),
            };
            async move { reply }
        })
        .await;

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.outcomes[0].result, CancelResult::NoResponse);
        assert_eq!(
            report.outcomes[1].result,
            CancelResult::Rejected {
                code: "1".to_string(),
                message: "already filled".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_absent_or_empty_listing_is_done_immediately() {
        for listing in [None, Some(Vec::<OutstandingOrder>::new())] {
            let mut calls = 0;
            let report = cancel_each(Market::Overseas, listing, &[], Duration::ZERO, |_| {
                calls += 1;
                async { None }
            })
            .await;
            assert_eq!(calls, 0);
            assert_eq!(report.state, BulkCancelState::Done);
            assert_eq!(report.attempted(), 0);
            assert_eq!(report.listed, 0);
        }
    }

    #[tokio::test]
    async fn test_requests_are_spaced_by_pause() {
        let rows = vec![order("1", "A"), order("2", "B"), order("3", "C")];
        let stamps = Mutex::new(Vec::new());

        cancel_each(
            Market::Domestic,
            Some(rows),
            &[],
            Duration::from_millis(20),
            |_| {
                stamps.lock().push(Instant::now());
                async { accepted() }
            },
        )
        .await;

        let stamps = stamps.into_inner();
        assert_eq!(stamps.len(), 3);
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(19));
        }
    }
}
