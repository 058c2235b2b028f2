//! Trading operation set.
//!
//! Each operation is a thin adapter over the dispatcher: build parameters,
//! dispatch, branch on presence/success, shape the body into typed rows.
//! Queries return an empty/zero/`None` sentinel on every failure path.
//! Orders return the envelope whenever one was received, so callers can
//! tell "no response" from "rejected".

pub mod domestic;
pub mod futures;
pub mod overseas;

use chrono::{Local, NaiveDate};
use kis_core::serde_str;
use rust_decimal::Decimal;
use serde_json::Value;

pub use domestic::PricePeriod;
pub use futures::FuturesPriceType;

/// Account product code for stock accounts.
pub const STOCK_PRODUCT_CODE: &str = "01";
/// Account product code for futures/options accounts.
pub const FUTURES_PRODUCT_CODE: &str = "03";

pub(crate) fn today() -> String {
    Local::now().format("%Y%m%d").to_string()
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

pub(crate) fn int_field(value: Option<&Value>) -> Option<i64> {
    value.and_then(|v| serde_str::int(v).ok())
}

pub(crate) fn decimal_field(value: Option<&Value>) -> Option<Decimal> {
    value.and_then(|v| serde_str::decimal(v).ok())
}
