//! Domestic futures/options operations.
//!
//! Orders go to the futures account (product code "03"). Option boards
//! join call and put rows on strike price.

use super::{decimal_field, today, FUTURES_PRODUCT_CODE};
use crate::client::KisClient;
use crate::dispatcher::RequestContext;
use crate::envelope::ResponseEnvelope;
use crate::models::{FuturesBalance, FuturesOrder, OptionBoardRow, OptionQuote};
use kis_core::{AmendKind, OrderSide, Price, Quantity, TrKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ORDER_PATH: &str = "/uapi/domestic-futureoption/v1/trading/order";
pub const AMEND_PATH: &str = "/uapi/domestic-futureoption/v1/trading/order-rvsecncl";
pub const OPEN_ORDERS_PATH: &str = "/uapi/domestic-futureoption/v1/trading/inquire-ccnl";
pub const BALANCE_PATH: &str = "/uapi/domestic-futureoption/v1/trading/inquire-balance";
pub const PRICE_PATH: &str = "/uapi/domestic-futureoption/v1/quotations/inquire-price";
pub const BOARD_PATH: &str = "/uapi/domestic-futureoption/v1/quotations/display-board-callput";

const BUY_LABEL: &str = "매수";
const SELL_LABEL: &str = "매도";

/// Price condition for futures/options orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuturesPriceType {
    Limit,
    Market,
    Conditional,
    /// Best available price.
    #[default]
    Best,
}

impl FuturesPriceType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Limit => "01",
            Self::Market => "02",
            Self::Conditional => "03",
            Self::Best => "04",
        }
    }
}

/// Series selector for the option board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoardSeries {
    Monthly,
    Mini,
    WeeklyMonday,
    WeeklyThursday,
}

impl BoardSeries {
    fn class_code(self) -> &'static str {
        match self {
            Self::Monthly => "",
            Self::Mini => "MKI",
            Self::WeeklyMonday => "WKM",
            Self::WeeklyThursday => "WKI",
        }
    }
}

impl KisClient {
    fn futures_account_ctx(&self, path: &str, key: TrKey) -> RequestContext {
        RequestContext::for_key(path, key)
            .param("CANO", self.session().futures_account_number())
            .param("ACNT_PRDT_CD", FUTURES_PRODUCT_CODE)
    }

    async fn futures_quote_field(&self, code: &str, field: &str) -> Option<Decimal> {
        let ctx = RequestContext::for_key(PRICE_PATH, TrKey::FuturesPrice)
            .param("FID_COND_MRKT_DIV_CODE", "F")
            .param("FID_INPUT_ISCD", code);
        let env = self.fetch_ok(ctx).await?;
        decimal_field(env.body().get("output1").and_then(|o| o.get(field)))
    }

    /// Last traded price.
    pub async fn futures_price(&self, code: &str) -> Option<Decimal> {
        self.futures_quote_field(code, "futs_prpr").await
    }

    /// Today's opening price.
    pub async fn futures_open_price(&self, code: &str) -> Option<Decimal> {
        self.futures_quote_field(code, "futs_oprc").await
    }

    pub async fn futures_place_order(
        &self,
        code: &str,
        quantity: Quantity,
        price: Price,
        side: OrderSide,
        price_type: FuturesPriceType,
    ) -> Option<ResponseEnvelope> {
        let ctx = RequestContext::for_key(ORDER_PATH, TrKey::FuturesOrder)
            .param("ORD_PRCS_DVSN_CD", "02")
            .param("CANO", self.session().futures_account_number())
            .param("ACNT_PRDT_CD", FUTURES_PRODUCT_CODE)
            .params([
                ("SLL_BUY_DVSN_CD", side.futures_code().to_string()),
                ("SHTN_PDNO", code.to_string()),
                ("ORD_QTY", quantity.to_wire()),
                ("UNIT_PRICE", price.to_wire()),
                ("NMPR_TYPE_CD", price_type.code().to_string()),
                ("KRX_NMPR_CNDT_CD", "0".to_string()),
                ("ORD_DVSN_CD", price_type.code().to_string()),
            ]);
        debug!(code, %side, %quantity, %price, "Placing futures order");
        self.submit(ctx).await
    }

    /// Revise or cancel the remaining quantity of a futures/options order.
    pub async fn futures_amend_or_cancel(
        &self,
        kind: AmendKind,
        order_id: &str,
        quantity: Quantity,
        price: Price,
        price_type: FuturesPriceType,
    ) -> Option<ResponseEnvelope> {
        let ctx = RequestContext::for_key(AMEND_PATH, TrKey::FuturesAmendCancel)
            .param("ORD_PRCS_DVSN_CD", "02")
            .param("CANO", self.session().futures_account_number())
            .param("ACNT_PRDT_CD", FUTURES_PRODUCT_CODE)
            .params([
                ("RVSE_CNCL_DVSN_CD", kind.code().to_string()),
                ("ORGN_ODNO", order_id.to_string()),
                ("ORD_QTY", quantity.to_wire()),
                ("UNIT_PRICE", price.to_wire()),
                ("NMPR_TYPE_CD", price_type.code().to_string()),
                ("KRX_NMPR_CNDT_CD", "0".to_string()),
                ("RMN_QTY_YN", "Y".to_string()),
                ("ORD_DVSN_CD", price_type.code().to_string()),
            ]);
        debug!(order_id, %kind, "Amending futures order");
        self.submit(ctx).await
    }

    /// Today's unfilled buy/sell orders.
    pub async fn futures_open_orders(&self) -> Vec<FuturesOrder> {
        let day = today();
        let ctx = self
            .futures_account_ctx(OPEN_ORDERS_PATH, TrKey::FuturesOpenOrders)
            .params([
                ("STRT_ORD_DT", day.as_str()),
                ("END_ORD_DT", day.as_str()),
                ("SLL_BUY_DVSN_CD", "00"),
                ("CCLD_NCCS_DVSN", "02"),
                ("SORT_SQN", "DS"),
                ("STRT_ODNO", "0"),
                ("PDNO", ""),
                ("MKET_ID_CD", ""),
                ("CTX_AREA_FK200", ""),
                ("CTX_AREA_NK200", ""),
            ]);
        let Some(env) = self.fetch_ok(ctx).await else {
            return Vec::new();
        };
        env.records::<FuturesOrder>("output1")
            .into_iter()
            .filter(|o| o.side_name == BUY_LABEL || o.side_name == SELL_LABEL)
            .collect()
    }

    /// Estimated deposit and P&L. `None` on failure.
    pub async fn futures_balance(&self) -> Option<FuturesBalance> {
        let ctx = self
            .futures_account_ctx(BALANCE_PATH, TrKey::FuturesBalance)
            .params([
                ("MGNA_DVSN", "01"),
                ("EXCC_STAT_CD", "1"),
                ("CTX_AREA_FK200", ""),
                ("CTX_AREA_NK200", ""),
            ]);
        self.fetch_ok(ctx).await?.decode_field("output2").ok()
    }

    /// Monthly option board for `expiry` (YYYYMM); `mini` selects mini KOSPI200.
    pub async fn option_board(&self, expiry: &str, mini: bool) -> Vec<OptionBoardRow> {
        let series = if mini {
            BoardSeries::Mini
        } else {
            BoardSeries::Monthly
        };
        self.fetch_board(expiry, series).await
    }

    /// Weekly option board for `expiry` (YYMMDD); Monday or Thursday series.
    pub async fn weekly_option_board(&self, expiry: &str, monday: bool) -> Vec<OptionBoardRow> {
        let series = if monday {
            BoardSeries::WeeklyMonday
        } else {
            BoardSeries::WeeklyThursday
        };
        self.fetch_board(expiry, series).await
    }

    async fn fetch_board(&self, expiry: &str, series: BoardSeries) -> Vec<OptionBoardRow> {
        let ctx = RequestContext::for_key(BOARD_PATH, TrKey::OptionBoard).params([
            ("FID_COND_MRKT_DIV_CODE", "O"),
            ("FID_COND_SCR_DIV_CODE", "20503"),
            ("FID_MRKT_CLS_CODE", "CO"),
            ("FID_MTRT_CNT", expiry),
            ("FID_COND_MRKT_CLS_CODE", series.class_code()),
            ("FID_MRKT_CLS_CODE1", "PO"),
        ]);
        let Some(env) = self.fetch_ok(ctx).await else {
            return Vec::new();
        };
        join_on_strike(env.records("output1"), env.records("output2"))
    }
}

/// Inner join of calls and puts on strike, in call order.
fn join_on_strike(calls: Vec<OptionQuote>, puts: Vec<OptionQuote>) -> Vec<OptionBoardRow> {
    calls
        .into_iter()
        .flat_map(|call| {
            puts.iter()
                .filter(|put| put.strike == call.strike)
                .map(|put| OptionBoardRow {
                    strike: call.strike,
                    call: call.clone(),
                    put: put.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::client;
    use crate::signer::HASHKEY_PATH;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};

    fn quote(code: &str, strike: &str) -> Value {
        json!({"optn_shrn_iscd": code, "acml_vol": "10", "optn_prdy_vrss": "-0.5",
               "optn_prdy_ctrt": "-3.1", "optn_prpr": "1.25", "acpr": strike})
    }

    #[tokio::test]
    async fn test_futures_prices() {
        let (client, mock) = client(false);
        mock.respond_json(
            PRICE_PATH,
            200,
            json!({"rt_cd": "0", "output1": {"futs_prpr": "352.45", "futs_oprc": "350.10"}}),
        );
        assert_eq!(client.futures_price("101V09").await, Some(dec!(352.45)));
        assert_eq!(client.futures_open_price("101V09").await, Some(dec!(350.10)));
        let req = &mock.requests()[0];
        assert_eq!(req.header("tr_id"), Some("FHMIF10000000"));
        assert_eq!(req.query_value("FID_COND_MRKT_DIV_CODE"), Some("F"));
    }

    #[tokio::test]
    async fn test_futures_price_failure_is_none() {
        let (client, mock) = client(false);
        mock.respond_json(PRICE_PATH, 200, json!({"rt_cd": "1", "msg1": "bad code"}));
        assert_eq!(client.futures_price("X").await, None);
    }

    #[tokio::test]
    async fn test_paper_futures_order_uses_futures_account() {
        let (client, mock) = client(true);
        mock.respond_json(HASHKEY_PATH, 200, json!({"HASH": "h"}))
            .respond_json(ORDER_PATH, 200, json!({"rt_cd": "0"}));

        client
            .futures_place_order(
                "101V09",
                Quantity::new(1),
                Price::ZERO,
                OrderSide::Buy,
                FuturesPriceType::default(),
            )
            .await
            .unwrap();

        let req = &mock.requests_to(ORDER_PATH)[0];
        assert_eq!(req.header("tr_id"), Some("VTTO1101U"));
        assert_eq!(
            req.body.as_deref(),
            Some(
                r#"{"ORD_PRCS_DVSN_CD":"02","CANO":"77778888","ACNT_PRDT_CD":"03","SLL_BUY_DVSN_CD":"02","SHTN_PDNO":"101V09","ORD_QTY":"1","UNIT_PRICE":"0","NMPR_TYPE_CD":"04","KRX_NMPR_CNDT_CD":"0","ORD_DVSN_CD":"04"}"#
            )
        );
    }

    #[tokio::test]
    async fn test_futures_cancel() {
        let (client, mock) = client(false);
        mock.respond_json(HASHKEY_PATH, 200, json!({"HASH": "h"}))
            .respond_json(AMEND_PATH, 200, json!({"rt_cd": "0"}));
        client
            .futures_amend_or_cancel(
                AmendKind::Cancel,
                "0000123",
                Quantity::new(1),
                Price::ZERO,
                FuturesPriceType::Limit,
            )
            .await
            .unwrap();
        let req = &mock.requests_to(AMEND_PATH)[0];
        assert_eq!(req.header("tr_id"), Some("TTTO1103U"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["RVSE_CNCL_DVSN_CD"], "02");
        assert_eq!(body["RMN_QTY_YN"], "Y");
        assert_eq!(body["CANO"], "33334444");
    }

    #[tokio::test]
    async fn test_open_orders_keep_buy_and_sell_only() {
        let (client, mock) = client(false);
        mock.respond_json(
            OPEN_ORDERS_PATH,
            200,
            json!({"rt_cd": "0", "output1": [
                {"pdno": "101V09", "odno": "1", "trad_dvsn_name": "매수", "ord_qty": "2", "qty": "2"},
                {"pdno": "101V09", "odno": "2", "trad_dvsn_name": "정정", "ord_qty": "1", "qty": "1"},
                {"pdno": "201V09", "odno": "3", "trad_dvsn_name": "매도", "ord_qty": "1", "qty": "0"}
            ]}),
        );
        let orders = client.futures_open_orders().await;
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].order_id, "3");
        assert_eq!(mock.requests()[0].query_value("CCLD_NCCS_DVSN"), Some("02"));
    }

    #[tokio::test]
    async fn test_futures_balance() {
        let (client, mock) = client(true);
        mock.respond_json(
            BALANCE_PATH,
            200,
            json!({"rt_cd": "0", "output2": {"prsm_dpast": "15000000",
                   "trad_pfls_amt_smtl": "120000", "evlu_pfls_amt_smtl": "-3000"}}),
        );
        let balance = client.futures_balance().await.unwrap();
        assert_eq!(balance.estimated_deposit, 15_000_000);
        assert_eq!(balance.unrealized_pnl, -3000);
        assert_eq!(mock.requests()[0].header("tr_id"), Some("VTFO6118R"));
    }

    #[tokio::test]
    async fn test_option_board_inner_join() {
        let (client, mock) = client(false);
        mock.respond_json(
            BOARD_PATH,
            200,
            json!({"rt_cd": "0",
                   "output1": [quote("C1", "350.00"), quote("C2", "352.5"), quote("C3", "355")],
                   "output2": [quote("P3", "355"), quote("P1", "350"), quote("P9", "360")]}),
        );

        let board = client.option_board("202408", true).await;
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].strike, dec!(350));
        assert_eq!((board[0].call.code.as_str(), board[0].put.code.as_str()), ("C1", "P1"));
        assert_eq!(board[1].put.code, "P3");
        assert_eq!(board[0].call.volume, 10);

        let req = &mock.requests()[0];
        assert_eq!(req.query_value("FID_COND_MRKT_CLS_CODE"), Some("MKI"));
        assert_eq!(req.query_value("FID_MTRT_CNT"), Some("202408"));
    }

    #[tokio::test]
    async fn test_weekly_board_series_codes() {
        let (client, mock) = client(false);
        mock.respond_json(BOARD_PATH, 200, json!({"rt_cd": "0", "output1": [], "output2": []}));
        assert!(client.weekly_option_board("240801", true).await.is_empty());
        assert!(client.weekly_option_board("240801", false).await.is_empty());
        assert!(client.option_board("202408", false).await.is_empty());
        let codes: Vec<String> = mock
            .requests()
            .iter()
            .map(|r| r.query_value("FID_COND_MRKT_CLS_CODE").unwrap_or("?").to_string())
            .collect();
        assert_eq!(codes, vec!["WKM", "WKI", ""]);
    }
}
