//! Typed rows for the tabular query results.
//!
//! Field names follow the domain; `serde(rename)` maps the upstream's
//! abbreviated column names. Numeric columns arrive as strings and are
//! decoded leniently (blank → zero).

use chrono::NaiveDate;
use kis_core::serde_str;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Domestic stock
// ============================================================================

/// One non-zero holding in the domestic account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    #[serde(rename = "pdno")]
    pub code: String,
    #[serde(rename = "prdt_name", default)]
    pub name: String,
    #[serde(rename = "hldg_qty", deserialize_with = "serde_str::uint", default)]
    pub quantity: u64,
    #[serde(rename = "ord_psbl_qty", deserialize_with = "serde_str::uint", default)]
    pub orderable_quantity: u64,
    #[serde(rename = "pchs_avg_pric", deserialize_with = "serde_str::decimal", default)]
    pub average_price: Decimal,
    #[serde(rename = "evlu_pfls_rt", deserialize_with = "serde_str::decimal", default)]
    pub profit_rate: Decimal,
    #[serde(rename = "prpr", deserialize_with = "serde_str::decimal", default)]
    pub current_price: Decimal,
    #[serde(rename = "bfdy_cprs_icdc", deserialize_with = "serde_str::decimal", default)]
    pub change: Decimal,
    #[serde(rename = "fltt_rt", deserialize_with = "serde_str::decimal", default)]
    pub change_rate: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountBalance {
    /// Total evaluation amount in KRW.
    pub total_evaluation: i64,
    pub holdings: Vec<Holding>,
}

/// One minute bar, oldest first after ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinuteBar {
    #[serde(rename = "stck_bsop_date")]
    pub date: String,
    #[serde(rename = "stck_cntg_hour")]
    pub time: String,
    #[serde(rename = "stck_oprc", deserialize_with = "serde_str::decimal", default)]
    pub open: Decimal,
    #[serde(rename = "stck_hgpr", deserialize_with = "serde_str::decimal", default)]
    pub high: Decimal,
    #[serde(rename = "stck_lwpr", deserialize_with = "serde_str::decimal", default)]
    pub low: Decimal,
    #[serde(rename = "stck_prpr", deserialize_with = "serde_str::decimal", default)]
    pub close: Decimal,
}

/// A saved HTS condition-search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub seq: String,
    #[serde(rename = "grp_nm", default)]
    pub group_name: String,
    #[serde(rename = "condition_nm", default)]
    pub name: String,
}

/// An instrument matched by a condition search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionMatch {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "serde_str::decimal", default)]
    pub price: Decimal,
    #[serde(rename = "chgrate", deserialize_with = "serde_str::decimal", default)]
    pub change_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    #[serde(rename = "stck_shrn_iscd")]
    pub code: String,
    #[serde(rename = "stck_prpr", deserialize_with = "serde_str::decimal", default)]
    pub price: Decimal,
    #[serde(rename = "prdy_ctrt", deserialize_with = "serde_str::decimal", default)]
    pub change_rate: Decimal,
}

/// Daily/weekly/monthly price row as sent by the upstream.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawDailyPrice {
    pub stck_bsop_date: String,
    #[serde(deserialize_with = "serde_str::decimal", default)]
    pub stck_oprc: Decimal,
    #[serde(deserialize_with = "serde_str::decimal", default)]
    pub stck_hgpr: Decimal,
    #[serde(deserialize_with = "serde_str::decimal", default)]
    pub stck_lwpr: Decimal,
    #[serde(deserialize_with = "serde_str::decimal", default)]
    pub stck_clpr: Decimal,
    #[serde(deserialize_with = "serde_str::uint", default)]
    pub acml_vol: u64,
}

/// Standard OHLCV bar, newest first as served.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
    /// (high - low) / close.
    pub inter_volatile: Option<Decimal>,
    /// Percent change against the previous (older) bar.
    pub pct_change: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawInvestorFlow {
    pub stck_bsop_date: String,
    #[serde(deserialize_with = "serde_str::int", default)]
    pub prsn_ntby_qty: i64,
    #[serde(deserialize_with = "serde_str::int", default)]
    pub frgn_ntby_qty: i64,
    #[serde(deserialize_with = "serde_str::int", default)]
    pub orgn_ntby_qty: i64,
}

/// Net buy quantities per investor type for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvestorFlow {
    pub date: NaiveDate,
    pub person: i64,
    pub foreign: i64,
    pub institution: i64,
    /// Everyone else: the negated sum of the three above.
    pub other: i64,
}

/// A domestic order that can still be revised or cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutstandingOrder {
    #[serde(rename = "odno")]
    pub order_id: String,
    #[serde(rename = "pdno")]
    pub code: String,
    #[serde(rename = "ord_qty", deserialize_with = "serde_str::uint", default)]
    pub quantity: u64,
    #[serde(rename = "ord_unpr", deserialize_with = "serde_str::decimal", default)]
    pub price: Decimal,
    #[serde(rename = "ord_tmd", default)]
    pub time: String,
    /// Order branch (`KRX_FWDG_ORD_ORGNO` when cancelling).
    #[serde(rename = "ord_gno_brno", default)]
    pub branch: String,
    #[serde(rename = "orgn_odno", default)]
    pub original_order_id: String,
    #[serde(rename = "psbl_qty", deserialize_with = "serde_str::uint", default)]
    pub cancellable_quantity: u64,
}

/// One row of the daily order/execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    #[serde(rename = "odno")]
    pub order_id: String,
    #[serde(rename = "ord_dt", default)]
    pub date: String,
    #[serde(rename = "orgn_odno", default)]
    pub original_order_id: String,
    #[serde(rename = "sll_buy_dvsn_cd_name", default)]
    pub side_name: String,
    #[serde(rename = "pdno", default)]
    pub code: String,
    #[serde(rename = "ord_qty", deserialize_with = "serde_str::uint", default)]
    pub quantity: u64,
    #[serde(rename = "ord_unpr", deserialize_with = "serde_str::decimal", default)]
    pub price: Decimal,
    #[serde(rename = "avg_prvs", deserialize_with = "serde_str::decimal", default)]
    pub average_price: Decimal,
    #[serde(rename = "cncl_yn", default)]
    pub cancelled: String,
    #[serde(rename = "tot_ccld_amt", deserialize_with = "serde_str::decimal", default)]
    pub total_amount: Decimal,
    #[serde(rename = "rmn_qty", deserialize_with = "serde_str::uint", default)]
    pub remaining_quantity: u64,
}

// ============================================================================
// Overseas stock
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverseasHolding {
    #[serde(rename = "ovrs_pdno")]
    pub code: String,
    #[serde(rename = "ovrs_excg_cd", default)]
    pub exchange: String,
    #[serde(rename = "ovrs_item_name", default)]
    pub name: String,
    #[serde(rename = "ovrs_cblc_qty", deserialize_with = "serde_str::uint", default)]
    pub quantity: u64,
    #[serde(rename = "ord_psbl_qty", deserialize_with = "serde_str::uint", default)]
    pub orderable_quantity: u64,
    #[serde(rename = "pchs_avg_pric", deserialize_with = "serde_str::decimal", default)]
    pub average_price: Decimal,
    #[serde(rename = "evlu_pfls_rt", deserialize_with = "serde_str::decimal", default)]
    pub profit_rate: Decimal,
    #[serde(rename = "now_pric2", deserialize_with = "serde_str::decimal", default)]
    pub current_price: Decimal,
    #[serde(rename = "frcr_evlu_pfls_amt", deserialize_with = "serde_str::decimal", default)]
    pub profit: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverseasBalance {
    /// Total evaluation profit in foreign currency.
    pub total_profit: Decimal,
    pub holdings: Vec<OverseasHolding>,
}

/// An instrument matched by the overseas price/rate screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverseasMatch {
    #[serde(rename = "symb")]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "serde_str::decimal", default)]
    pub last: Decimal,
    #[serde(deserialize_with = "serde_str::decimal", default)]
    pub rate: Decimal,
}

/// An unfilled overseas order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverseasOrder {
    #[serde(rename = "odno")]
    pub order_id: String,
    #[serde(rename = "pdno")]
    pub code: String,
    #[serde(rename = "ft_ord_qty", deserialize_with = "serde_str::uint", default)]
    pub quantity: u64,
    #[serde(rename = "ft_ord_unpr3", deserialize_with = "serde_str::decimal", default)]
    pub price: Decimal,
    #[serde(rename = "ord_tmd", default)]
    pub time: String,
    #[serde(rename = "ovrs_excg_cd", default)]
    pub exchange: String,
    #[serde(rename = "orgn_odno", default)]
    pub original_order_id: String,
    #[serde(rename = "nccs_qty", deserialize_with = "serde_str::uint", default)]
    pub unfilled_quantity: u64,
    #[serde(rename = "sll_buy_dvsn_cd", default)]
    pub side_code: String,
    #[serde(rename = "sll_buy_dvsn_cd_name", default)]
    pub side_name: String,
}

/// An overseas order with fills today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverseasFill {
    #[serde(rename = "odno")]
    pub order_id: String,
    #[serde(rename = "pdno")]
    pub code: String,
    #[serde(rename = "ft_ord_qty", deserialize_with = "serde_str::uint", default)]
    pub quantity: u64,
    #[serde(rename = "ft_ord_unpr3", deserialize_with = "serde_str::decimal", default)]
    pub price: Decimal,
    #[serde(rename = "ft_ccld_unpr3", deserialize_with = "serde_str::decimal", default)]
    pub fill_price: Decimal,
    #[serde(rename = "ft_ccld_qty", deserialize_with = "serde_str::uint", default)]
    pub fill_quantity: u64,
    #[serde(rename = "ord_tmd", default)]
    pub time: String,
    #[serde(rename = "orgn_odno", default)]
    pub original_order_id: String,
    #[serde(rename = "nccs_qty", deserialize_with = "serde_str::uint", default)]
    pub unfilled_quantity: u64,
    #[serde(rename = "sll_buy_dvsn_cd", default)]
    pub side_code: String,
    #[serde(rename = "sll_buy_dvsn_cd_name", default)]
    pub side_name: String,
}

// ============================================================================
// Futures / options
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesOrder {
    #[serde(rename = "pdno")]
    pub code: String,
    #[serde(rename = "prdt_name", default)]
    pub name: String,
    #[serde(rename = "ord_qty", deserialize_with = "serde_str::uint", default)]
    pub quantity: u64,
    #[serde(rename = "qty", deserialize_with = "serde_str::uint", default)]
    pub unfilled_quantity: u64,
    #[serde(rename = "odno", default)]
    pub order_id: String,
    /// "매수" (buy) or "매도" (sell) for live orders.
    #[serde(rename = "trad_dvsn_name", default)]
    pub side_name: String,
    #[serde(rename = "nmpr_type_name", default)]
    pub price_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuturesBalance {
    #[serde(rename = "prsm_dpast", deserialize_with = "serde_str::int", default)]
    pub estimated_deposit: i64,
    #[serde(rename = "trad_pfls_amt_smtl", deserialize_with = "serde_str::int", default)]
    pub realized_pnl: i64,
    #[serde(rename = "evlu_pfls_amt_smtl", deserialize_with = "serde_str::int", default)]
    pub unrealized_pnl: i64,
}

/// One side (call or put) of an option board line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    #[serde(rename = "optn_shrn_iscd")]
    pub code: String,
    #[serde(rename = "acml_vol", deserialize_with = "serde_str::uint", default)]
    pub volume: u64,
    #[serde(rename = "optn_prdy_vrss", deserialize_with = "serde_str::decimal", default)]
    pub change: Decimal,
    #[serde(rename = "optn_prdy_ctrt", deserialize_with = "serde_str::decimal", default)]
    pub change_rate: Decimal,
    #[serde(rename = "optn_prpr", deserialize_with = "serde_str::decimal", default)]
    pub price: Decimal,
    #[serde(rename = "acpr", deserialize_with = "serde_str::decimal", default)]
    pub strike: Decimal,
}

/// Call and put at the same strike.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionBoardRow {
    pub call: OptionQuote,
    pub strike: Decimal,
    pub put: OptionQuote,
}
