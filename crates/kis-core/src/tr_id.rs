//! Transaction-id lookup table.
//!
//! Every REST operation is routed by a transaction id (`tr_id` header).
//! The table is keyed by a small enum so each routing case is a pure
//! function of (operation, side, environment). Only live codes are stored;
//! paper codes follow from [`rewrite_tr_id`].

use crate::env::{rewrite_tr_id, TradingEnv};
use crate::order::OrderSide;
use std::borrow::Cow;

/// Operations with a fixed transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrKey {
    // Domestic stock trading
    DomesticBalance,
    DomesticOrder(OrderSide),
    DomesticAmendCancel,
    DomesticOutstandingOrders,
    DomesticDailyExecutions,
    DomesticBuyableCash,
    // Domestic stock quotations
    DomesticCurrentPrice,
    DomesticAskingPrice,
    DomesticRecentTrades,
    DomesticDailyPrice,
    DomesticInvestorTrend,
    DomesticMinuteChart,
    DomesticStockInfo,
    FluctuationRanking,
    ConditionList,
    ConditionMatches,
    // Overseas stock
    OverseasBalance,
    OverseasOrder(OrderSide),
    OverseasAmendCancel,
    OverseasOutstandingOrders,
    OverseasFinishedOrders,
    OverseasCurrentPrice,
    OverseasTickerInfo,
    OverseasConditionSearch,
    // Domestic futures / options
    FuturesOrder,
    FuturesAmendCancel,
    FuturesOpenOrders,
    FuturesBalance,
    FuturesPrice,
    OptionBoard,
}

impl TrKey {
    /// Transaction id used against the live environment.
    pub const fn live_code(self) -> &'static str {
        match self {
            Self::DomesticBalance => "TTTC8434R",
            Self::DomesticOrder(OrderSide::Buy) => "TTTC0012U",
            Self::DomesticOrder(OrderSide::Sell) => "TTTC0011U",
            Self::DomesticAmendCancel => "TTTC0013U",
            Self::DomesticOutstandingOrders => "TTTC8036R",
            Self::DomesticDailyExecutions => "TTTC8001R",
            Self::DomesticBuyableCash => "TTTC8908R",
            Self::DomesticCurrentPrice => "FHKST01010100",
            Self::DomesticAskingPrice => "FHKST01010200",
            Self::DomesticRecentTrades => "FHKST01010300",
            Self::DomesticDailyPrice => "FHKST01010400",
            Self::DomesticInvestorTrend => "FHKST01010900",
            Self::DomesticMinuteChart => "FHKST03010200",
            Self::DomesticStockInfo => "CTPF1002R",
            Self::FluctuationRanking => "FHPST01700000",
            Self::ConditionList => "HHKST03900300",
            Self::ConditionMatches => "HHKST03900400",
            Self::OverseasBalance => "TTTS3012R",
            Self::OverseasOrder(OrderSide::Buy) => "TTTT1002U",
            Self::OverseasOrder(OrderSide::Sell) => "TTTT1006U",
            Self::OverseasAmendCancel => "TTTT1004U",
            Self::OverseasOutstandingOrders => "TTTS3018R",
            Self::OverseasFinishedOrders => "TTTS3035R",
            Self::OverseasCurrentPrice => "HHDFS00000300",
            Self::OverseasTickerInfo => "CTPF1702R",
            Self::OverseasConditionSearch => "HHDFS76410000",
            Self::FuturesOrder => "TTTO1101U",
            Self::FuturesAmendCancel => "TTTO1103U",
            Self::FuturesOpenOrders => "TTTO5201R",
            Self::FuturesBalance => "CTFO6118R",
            Self::FuturesPrice => "FHMIF10000000",
            Self::OptionBoard => "FHPIF05030100",
        }
    }

    /// Transaction id for the given environment.
    pub fn code(self, env: TradingEnv) -> Cow<'static, str> {
        rewrite_tr_id(self.live_code(), env)
    }

    /// Whether the operation mutates account state (POST + hash-key).
    pub const fn is_order(self) -> bool {
        matches!(
            self,
            Self::DomesticOrder(_)
                | Self::DomesticAmendCancel
                | Self::OverseasOrder(_)
                | Self::OverseasAmendCancel
                | Self::FuturesOrder
                | Self::FuturesAmendCancel
        )
    }
}
