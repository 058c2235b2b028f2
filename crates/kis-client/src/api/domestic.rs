//! Domestic stock operations.

use super::{format_date, int_field, parse_date, today, STOCK_PRODUCT_CODE};
use crate::bulk_cancel::{cancel_each, BulkCancelReport};
use crate::client::KisClient;
use crate::dispatcher::RequestContext;
use crate::envelope::ResponseEnvelope;
use crate::models::{
    AccountBalance, Condition, ConditionMatch, Execution, Holding, InvestorFlow, MinuteBar,
    OhlcvBar, OutstandingOrder, RankingEntry, RawDailyPrice, RawInvestorFlow,
};
use chrono::{Local, NaiveDate};
use kis_core::{AmendKind, Market, OrderDivision, OrderSide, Price, Quantity, TrKey};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

pub const BALANCE_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-balance";
pub const ORDER_PATH: &str = "/uapi/domestic-stock/v1/trading/order-cash";
pub const AMEND_PATH: &str = "/uapi/domestic-stock/v1/trading/order-rvsecncl";
pub const OUTSTANDING_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-psbl-rvsecncl";
pub const DAILY_EXECUTIONS_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-daily-ccld";
pub const BUYABLE_CASH_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-psbl-order";
pub const CURRENT_PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-price";
pub const ASKING_PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-asking-price-exp-ccn";
pub const RECENT_TRADES_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-ccnl";
pub const DAILY_PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-daily-price";
pub const INVESTOR_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-investor";
pub const MINUTE_CHART_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-time-itemchartprice";
pub const STOCK_INFO_PATH: &str = "/uapi/domestic-stock/v1/quotations/search-stock-info";
pub const FLUCTUATION_PATH: &str = "/uapi/domestic-stock/v1/ranking/fluctuation";
pub const CONDITION_LIST_PATH: &str = "/uapi/domestic-stock/v1/quotations/psearch-title";
pub const CONDITION_RESULT_PATH: &str = "/uapi/domestic-stock/v1/quotations/psearch-result";

/// Default branch for revise/cancel when the listing has none.
pub const DEFAULT_ORDER_BRANCH: &str = "06010";
/// Exchange routing for domestic orders.
pub const KRX: &str = "KRX";

/// Bar period for price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricePeriod {
    #[default]
    Day,
    Week,
    Month,
}

impl PricePeriod {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Day => "D",
            Self::Week => "W",
            Self::Month => "M",
        }
    }
}

impl KisClient {
    fn account_params(&self, ctx: RequestContext) -> RequestContext {
        ctx.param("CANO", self.session().account_number())
            .param("ACNT_PRDT_CD", STOCK_PRODUCT_CODE)
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// Total evaluation and non-zero holdings. Zero/empty on failure.
    pub async fn account_balance(&self) -> AccountBalance {
        let ctx = self
            .account_params(RequestContext::for_key(BALANCE_PATH, TrKey::DomesticBalance))
            .params([
                ("AFHR_FLPR_YN", "N"),
                ("FNCG_AMT_AUTO_RDPT_YN", "N"),
                ("FUND_STTL_ICLD_YN", "N"),
                ("INQR_DVSN", "01"),
                ("OFL_YN", "N"),
                ("PRCS_DVSN", "01"),
                ("UNPR_DVSN", "01"),
                ("CTX_AREA_FK100", ""),
                ("CTX_AREA_NK100", ""),
            ]);

        let Some(env) = self.fetch_ok(ctx).await else {
            return AccountBalance::default();
        };
        let total_evaluation =
            int_field(env.body().pointer("/output2/0/tot_evlu_amt")).unwrap_or_default();
        let holdings = env
            .records::<Holding>("output1")
            .into_iter()
            .filter(|h| h.quantity != 0)
            .collect();
        AccountBalance {
            total_evaluation,
            holdings,
        }
    }

    /// Cash available for a buy at `price`. Zero on failure.
    pub async fn buyable_cash(&self, code: &str, price: Price) -> i64 {
        let ctx = self
            .account_params(RequestContext::for_key(BUYABLE_CASH_PATH, TrKey::DomesticBuyableCash))
            .params([
                ("PDNO", code.to_string()),
                ("ORD_UNPR", price.to_wire()),
                ("ORD_DVSN", "02".to_string()),
                ("CMA_EVLU_AMT_ICLD_YN", "Y".to_string()),
                ("OVRS_ICLD_YN", "N".to_string()),
            ]);
        match self.fetch_ok(ctx).await {
            Some(env) => int_field(env.body().pointer("/output/ord_psbl_cash")).unwrap_or_default(),
            None => 0,
        }
    }

    /// Orders that can still be revised or cancelled.
    pub async fn outstanding_orders(&self) -> Vec<OutstandingOrder> {
        let ctx = self
            .account_params(RequestContext::for_key(
                OUTSTANDING_PATH,
                TrKey::DomesticOutstandingOrders,
            ))
            .params([
                ("CTX_AREA_FK100", ""),
                ("CTX_AREA_NK100", ""),
                ("INQR_DVSN_1", "0"),
                ("INQR_DVSN_2", "0"),
            ]);
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output"),
            None => Vec::new(),
        }
    }

    /// Orders and executions between `start` and `end` (default today).
    pub async fn daily_executions(&self, start: NaiveDate, end: Option<NaiveDate>) -> Vec<Execution> {
        let end = end.map(format_date).unwrap_or_else(today);
        let ctx = self
            .account_params(RequestContext::for_key(
                DAILY_EXECUTIONS_PATH,
                TrKey::DomesticDailyExecutions,
            ))
            .params([
                ("INQR_STRT_DT", format_date(start)),
                ("INQR_END_DT", end),
            ])
            .params([
                ("SLL_BUY_DVSN_CD", "00"),
                ("INQR_DVSN", "00"),
                ("PDNO", ""),
                ("CCLD_DVSN", "00"),
                ("ORD_GNO_BRNO", ""),
                ("ODNO", ""),
                ("INQR_DVSN_3", "00"),
                ("INQR_DVSN_1", ""),
                ("INQR_DVSN_2", ""),
                ("CTX_AREA_FK100", ""),
                ("CTX_AREA_NK100", ""),
            ]);
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output1"),
            None => Vec::new(),
        }
    }

    // ========================================================================
    // Quotations
    // ========================================================================

    fn quote_ctx(&self, path: &str, key: TrKey, code: &str) -> RequestContext {
        RequestContext::for_key(path, key)
            .param("FID_COND_MRKT_DIV_CODE", "J")
            .param("FID_INPUT_ISCD", code)
    }

    /// Raw current-price record.
    pub async fn current_price(&self, code: &str) -> Option<Value> {
        let ctx = self.quote_ctx(CURRENT_PRICE_PATH, TrKey::DomesticCurrentPrice, code);
        self.fetch_ok(ctx).await?.field("output").cloned()
    }

    /// Raw order-book record (ten levels each side).
    pub async fn asking_price(&self, code: &str) -> Option<Value> {
        let ctx = self.quote_ctx(ASKING_PRICE_PATH, TrKey::DomesticAskingPrice, code);
        self.fetch_ok(ctx).await?.field("output1").cloned()
    }

    /// Raw product information record.
    pub async fn stock_info(&self, code: &str) -> Option<Value> {
        let ctx = RequestContext::for_key(STOCK_INFO_PATH, TrKey::DomesticStockInfo)
            .param("PRDT_TYPE_CD", "300")
            .param("PDNO", code);
        self.fetch_ok(ctx).await?.field("output").cloned()
    }

    /// Most recent trades, newest first.
    pub async fn recent_trades(&self, code: &str) -> Vec<Value> {
        let ctx = self.quote_ctx(RECENT_TRADES_PATH, TrKey::DomesticRecentTrades, code);
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output"),
            None => Vec::new(),
        }
    }

    /// Minute bars up to now, oldest first.
    pub async fn minute_chart(&self, code: &str) -> Vec<MinuteBar> {
        let ctx = RequestContext::for_key(MINUTE_CHART_PATH, TrKey::DomesticMinuteChart)
            .param("FID_ETC_CLS_CODE", "")
            .param("FID_COND_MRKT_DIV_CODE", "J")
            .param("FID_INPUT_ISCD", code)
            .param("FID_INPUT_HOUR_1", Local::now().format("%H%M%S").to_string())
            .param("FID_PW_DATA_INCU_YN", "Y");
        let Some(env) = self.fetch_ok(ctx).await else {
            return Vec::new();
        };
        let mut bars: Vec<MinuteBar> = env.records("output2");
        bars.reverse();
        bars
    }

    /// Raw daily/weekly/monthly rows (latest 30), newest first.
    pub async fn daily_price_history(&self, code: &str, period: PricePeriod) -> Vec<Value> {
        let ctx = self
            .quote_ctx(DAILY_PRICE_PATH, TrKey::DomesticDailyPrice, code)
            .param("FID_PERIOD_DIV_CODE", period.code())
            .param("FID_ORG_ADJ_PRC", "0000000001");
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output"),
            None => Vec::new(),
        }
    }

    /// OHLCV bars, newest first. With `indicators`, adds intraday
    /// volatility and percent change against the older bar.
    pub async fn ohlcv_history(
        &self,
        code: &str,
        period: PricePeriod,
        indicators: bool,
    ) -> Vec<OhlcvBar> {
        let rows: Vec<RawDailyPrice> = self
            .daily_price_history(code, period)
            .await
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        to_ohlcv(rows, indicators)
    }

    /// Net buys per investor type, newest first.
    pub async fn investor_trend(&self, code: &str) -> Vec<InvestorFlow> {
        let ctx = self.quote_ctx(INVESTOR_PATH, TrKey::DomesticInvestorTrend, code);
        let Some(env) = self.fetch_ok(ctx).await else {
            return Vec::new();
        };
        env.records::<RawInvestorFlow>("output")
            .into_iter()
            .filter_map(|r| {
                let date = parse_date(&r.stck_bsop_date)?;
                // Out-of-range quantities drop the row.
                let other = r
                    .prsn_ntby_qty
                    .checked_add(r.frgn_ntby_qty)?
                    .checked_add(r.orgn_ntby_qty)?
                    .checked_neg()?;
                Some(InvestorFlow {
                    date,
                    person: r.prsn_ntby_qty,
                    foreign: r.frgn_ntby_qty,
                    institution: r.orgn_ntby_qty,
                    other,
                })
            })
            .collect()
    }

    /// Top gainers across the whole market.
    pub async fn fluctuation_ranking(&self) -> Vec<RankingEntry> {
        let ctx = RequestContext::for_key(FLUCTUATION_PATH, TrKey::FluctuationRanking).params([
            ("fid_cond_mrkt_div_code", "J"),
            ("fid_cond_scr_div_code", "20170"),
            ("fid_input_iscd", "0000"),
            ("fid_rank_sort_cls_code", "0"),
            ("fid_input_cnt_1", "0"),
            ("fid_prc_cls_code", "0"),
            ("fid_input_price_1", ""),
            ("fid_input_price_2", ""),
            ("fid_vol_cnt", ""),
            ("fid_trgt_cls_code", "0"),
            ("fid_trgt_exls_cls_code", "0"),
            ("fid_div_cls_code", "0"),
            ("fid_rsfl_rate1", ""),
            ("fid_rsfl_rate2", ""),
        ]);
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output"),
            None => Vec::new(),
        }
    }

    /// Saved HTS condition searches for the session's HTS id.
    pub async fn list_conditions(&self) -> Vec<Condition> {
        let ctx = RequestContext::for_key(CONDITION_LIST_PATH, TrKey::ConditionList)
            .param("user_id", self.session().hts_id());
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output2"),
            None => Vec::new(),
        }
    }

    /// Instruments currently matching condition `seq`.
    pub async fn condition_matches(&self, seq: &str) -> Vec<ConditionMatch> {
        let ctx = RequestContext::for_key(CONDITION_RESULT_PATH, TrKey::ConditionMatches)
            .param("user_id", self.session().hts_id())
            .param("seq", seq);
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output2"),
            None => Vec::new(),
        }
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Place a cash order on KRX.
    pub async fn place_order(
        &self,
        code: &str,
        quantity: Quantity,
        price: Price,
        side: OrderSide,
        division: &OrderDivision,
    ) -> Option<ResponseEnvelope> {
        let ctx = self
            .account_params(RequestContext::for_key(ORDER_PATH, TrKey::DomesticOrder(side)))
            .params([
                ("PDNO", code.to_string()),
                ("ORD_DVSN", division.code().to_string()),
                ("ORD_QTY", quantity.to_wire()),
                ("ORD_UNPR", price.to_wire()),
                ("CTAC_TLNO", String::new()),
                ("SLL_TYPE", "01".to_string()),
                ("EXCG_ID_DVSN_CD", KRX.to_string()),
            ]);
        debug!(code, %side, %quantity, %price, "Placing domestic order");
        self.submit(ctx).await
    }

    pub async fn buy(&self, code: &str, quantity: Quantity, price: Price) -> Option<ResponseEnvelope> {
        self.place_order(code, quantity, price, OrderSide::Buy, &OrderDivision::Limit)
            .await
    }

    pub async fn sell(&self, code: &str, quantity: Quantity, price: Price) -> Option<ResponseEnvelope> {
        self.place_order(code, quantity, price, OrderSide::Sell, &OrderDivision::Limit)
            .await
    }

    async fn amend_order(
        &self,
        kind: AmendKind,
        order_id: &str,
        branch: &str,
        quantity: Quantity,
        price: Price,
    ) -> Option<ResponseEnvelope> {
        let branch = if branch.is_empty() {
            DEFAULT_ORDER_BRANCH
        } else {
            branch
        };
        let ctx = self
            .account_params(RequestContext::for_key(AMEND_PATH, TrKey::DomesticAmendCancel))
            .params([
                ("KRX_FWDG_ORD_ORGNO", branch.to_string()),
                ("ORGN_ODNO", order_id.to_string()),
                ("ORD_DVSN", OrderDivision::Limit.code().to_string()),
                ("RVSE_CNCL_DVSN_CD", kind.code().to_string()),
                ("ORD_QTY", quantity.to_wire()),
                ("ORD_UNPR", price.to_wire()),
                ("QTY_ALL_ORD_YN", "Y".to_string()),
                ("EXCG_ID_DVSN_CD", KRX.to_string()),
            ]);
        debug!(order_id, %kind, "Amending domestic order");
        self.submit(ctx).await
    }

    /// Cancel the whole remaining quantity of an order.
    pub async fn cancel_order(
        &self,
        order_id: &str,
        branch: &str,
        quantity: Quantity,
        price: Price,
    ) -> Option<ResponseEnvelope> {
        self.amend_order(AmendKind::Cancel, order_id, branch, quantity, price)
            .await
    }

    /// Re-price an order.
    pub async fn revise_order(
        &self,
        order_id: &str,
        branch: &str,
        quantity: Quantity,
        price: Price,
    ) -> Option<ResponseEnvelope> {
        self.amend_order(AmendKind::Revise, order_id, branch, quantity, price)
            .await
    }

    /// Cancel every outstanding order except those on `skip_codes`.
    pub async fn cancel_all(&self, skip_codes: &[String]) -> BulkCancelReport {
        let listing = self.outstanding_orders().await;
        let client = self;
        cancel_each(
            Market::Domestic,
            Some(listing),
            skip_codes,
            self.cancel_pause(),
            move |order: OutstandingOrder| async move {
                client
                    .cancel_order(
                        &order.order_id,
                        &order.branch,
                        Quantity::new(order.quantity),
                        Price::new(order.price),
                    )
                    .await
            },
        )
        .await
    }
}

fn to_ohlcv(rows: Vec<RawDailyPrice>, indicators: bool) -> Vec<OhlcvBar> {
    let bars: Vec<OhlcvBar> = rows
        .into_iter()
        .filter_map(|r| {
            Some(OhlcvBar {
                date: parse_date(&r.stck_bsop_date)?,
                open: r.stck_oprc,
                high: r.stck_hgpr,
                low: r.stck_lwpr,
                close: r.stck_clpr,
                volume: r.acml_vol,
                inter_volatile: None,
                pct_change: None,
            })
        })
        .collect();
    if !indicators {
        return bars;
    }

    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
    bars.into_iter()
        .enumerate()
        .map(|(i, mut bar)| {
            if !bar.close.is_zero() {
                bar.inter_volatile = Some((bar.high - bar.low) / bar.close);
            }
            bar.pct_change = closes
                .get(i + 1)
                .copied()
                .filter(|older| !older.is_zero())
                .map(|older| (bar.close - older) / older * Decimal::ONE_HUNDRED);
            bar
        })
        .collect()
}
