//! Overseas (US) stock operations.

use super::{decimal_field, today, STOCK_PRODUCT_CODE};
use crate::bulk_cancel::{cancel_each, BulkCancelReport};
use crate::client::KisClient;
use crate::dispatcher::RequestContext;
use crate::envelope::ResponseEnvelope;
use crate::models::{OverseasBalance, OverseasFill, OverseasHolding, OverseasMatch, OverseasOrder};
use kis_core::{
    AmendKind, Market, OrderDivision, OrderSide, OverseasExchange, Price, Quantity, TrKey,
};
use serde_json::Value;
use tracing::debug;

pub const BALANCE_PATH: &str = "/uapi/overseas-stock/v1/trading/inquire-balance";
pub const ORDER_PATH: &str = "/uapi/overseas-stock/v1/trading/order";
pub const AMEND_PATH: &str = "/uapi/overseas-stock/v1/trading/order-rvsecncl";
pub const OUTSTANDING_PATH: &str = "/uapi/overseas-stock/v1/trading/inquire-nccs";
pub const FINISHED_PATH: &str = "/uapi/overseas-stock/v1/trading/inquire-ccnl";
pub const PRICE_PATH: &str = "/uapi/overseas-price/v1/quotations/price";
pub const TICKER_INFO_PATH: &str = "/uapi/overseas-price/v1/quotations/search-info";
pub const SEARCH_PATH: &str = "/uapi/overseas-price/v1/quotations/inquire-search";

const SETTLEMENT_CURRENCY: &str = "USD";

impl KisClient {
    fn overseas_account_ctx(&self, path: &str, key: TrKey) -> RequestContext {
        RequestContext::for_key(path, key)
            .param("CANO", self.session().account_number())
            .param("ACNT_PRDT_CD", STOCK_PRODUCT_CODE)
    }

    /// Total evaluation profit and non-zero holdings on `exchange`.
    pub async fn overseas_balance(&self, exchange: OverseasExchange) -> OverseasBalance {
        let ctx = self
            .overseas_account_ctx(BALANCE_PATH, TrKey::OverseasBalance)
            .params([
                ("OVRS_EXCG_CD", exchange.order_code()),
                ("TR_CRCY_CD", SETTLEMENT_CURRENCY),
                ("CTX_AREA_FK200", ""),
                ("CTX_AREA_NK200", ""),
            ]);
        let Some(env) = self.fetch_ok(ctx).await else {
            return OverseasBalance::default();
        };
        let holdings: Vec<OverseasHolding> = env
            .records::<OverseasHolding>("output1")
            .into_iter()
            .filter(|h| h.quantity != 0)
            .collect();
        OverseasBalance {
            total_profit: decimal_field(env.body().pointer("/output2/tot_evlu_pfls_amt"))
                .unwrap_or_default(),
            holdings,
        }
    }

    /// Raw current-price record.
    pub async fn overseas_current_price(
        &self,
        exchange: OverseasExchange,
        symbol: &str,
    ) -> Option<Value> {
        let ctx = RequestContext::for_key(PRICE_PATH, TrKey::OverseasCurrentPrice)
            .param("AUTH", "")
            .param("EXCD", exchange.quote_code())
            .param("SYMB", symbol);
        self.fetch_ok(ctx).await?.field("output").cloned()
    }

    /// Raw product information record.
    pub async fn overseas_ticker_info(
        &self,
        exchange: OverseasExchange,
        symbol: &str,
    ) -> Option<Value> {
        let ctx = RequestContext::for_key(TICKER_INFO_PATH, TrKey::OverseasTickerInfo)
            .param("PRDT_TYPE_CD", exchange.product_type_code())
            .param("PDNO", symbol);
        self.fetch_ok(ctx).await?.field("output").cloned()
    }

    /// Instruments priced 0..5 USD and up 10..100% today.
    pub async fn overseas_condition_search(&self, exchange: OverseasExchange) -> Vec<OverseasMatch> {
        let ctx = RequestContext::for_key(SEARCH_PATH, TrKey::OverseasConditionSearch).params([
            ("AUTH", ""),
            ("EXCD", exchange.quote_code()),
            ("CO_YN_PRICECUR", "1"),
            ("CO_ST_PRICECUR", "0"),
            ("CO_EN_PRICECUR", "5"),
            ("CO_YN_RATE", "1"),
            ("CO_ST_RATE", "10"),
            ("CO_EN_RATE", "100"),
        ]);
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output2"),
            None => Vec::new(),
        }
    }

    pub async fn overseas_place_order(
        &self,
        exchange: OverseasExchange,
        symbol: &str,
        quantity: Quantity,
        price: Price,
        side: OrderSide,
        division: &OrderDivision,
    ) -> Option<ResponseEnvelope> {
        let ctx = self
            .overseas_account_ctx(ORDER_PATH, TrKey::OverseasOrder(side))
            .params([
                ("OVRS_EXCG_CD", exchange.order_code().to_string()),
                ("PDNO", symbol.to_string()),
                ("ORD_QTY", quantity.to_wire()),
                ("OVRS_ORD_UNPR", price.to_wire()),
                ("ORD_SVR_DVSN_CD", "0".to_string()),
                ("ORD_DVSN", division.code().to_string()),
            ]);
        debug!(%exchange, symbol, %side, %quantity, %price, "Placing overseas order");
        self.submit(ctx).await
    }

    pub async fn overseas_buy(
        &self,
        exchange: OverseasExchange,
        symbol: &str,
        quantity: Quantity,
        price: Price,
    ) -> Option<ResponseEnvelope> {
        self.overseas_place_order(
            exchange,
            symbol,
            quantity,
            price,
            OrderSide::Buy,
            &OrderDivision::Limit,
        )
        .await
    }

    pub async fn overseas_sell(
        &self,
        exchange: OverseasExchange,
        symbol: &str,
        quantity: Quantity,
        price: Price,
    ) -> Option<ResponseEnvelope> {
        self.overseas_place_order(
            exchange,
            symbol,
            quantity,
            price,
            OrderSide::Sell,
            &OrderDivision::Limit,
        )
        .await
    }

    /// Unfilled orders, on one exchange or all of them.
    pub async fn overseas_outstanding_orders(
        &self,
        exchange: Option<OverseasExchange>,
    ) -> Vec<OverseasOrder> {
        let ctx = self
            .overseas_account_ctx(OUTSTANDING_PATH, TrKey::OverseasOutstandingOrders)
            .params([
                ("OVRS_EXCG_CD", exchange.map(|e| e.order_code()).unwrap_or_default()),
                ("SORT_SQN", "DS"),
                ("CTX_AREA_FK200", ""),
                ("CTX_AREA_NK200", ""),
            ]);
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output"),
            None => Vec::new(),
        }
    }

    /// Today's orders with at least one fill.
    pub async fn overseas_finished_orders(&self, exchange: OverseasExchange) -> Vec<OverseasFill> {
        let day = today();
        let ctx = self
            .overseas_account_ctx(FINISHED_PATH, TrKey::OverseasFinishedOrders)
            .params([
                ("PDNO", "%"),
                ("ORD_STRT_DT", day.as_str()),
                ("ORD_END_DT", day.as_str()),
                ("SLL_BUY_DVSN", "00"),
                ("CCLD_NCCS_DVSN", "01"),
                ("OVRS_EXCG_CD", exchange.order_code()),
                ("SORT_SQN", "AS"),
                ("ORD_DT", ""),
                ("ORD_GNO_BRNO", ""),
                ("ODNO", ""),
                ("CTX_AREA_FK200", ""),
                ("CTX_AREA_NK200", ""),
            ]);
        match self.fetch_ok(ctx).await {
            Some(env) => env.records("output"),
            None => Vec::new(),
        }
    }

    async fn overseas_amend(
        &self,
        kind: AmendKind,
        exchange_code: &str,
        order_id: &str,
        symbol: &str,
        quantity: Quantity,
        price: Price,
    ) -> Option<ResponseEnvelope> {
        let ctx = self
            .overseas_account_ctx(AMEND_PATH, TrKey::OverseasAmendCancel)
            .params([
                ("OVRS_EXCG_CD", exchange_code.to_string()),
                ("PDNO", symbol.to_string()),
                ("ORGN_ODNO", order_id.to_string()),
                ("ORD_SVR_DVSN_CD", "0".to_string()),
                ("RVSE_CNCL_DVSN_CD", kind.code().to_string()),
                ("ORD_QTY", quantity.to_wire()),
                ("OVRS_ORD_UNPR", price.to_wire()),
            ]);
        debug!(order_id, symbol, %kind, "Amending overseas order");
        self.submit(ctx).await
    }

    pub async fn overseas_cancel_order(
        &self,
        exchange: OverseasExchange,
        order_id: &str,
        symbol: &str,
        quantity: Quantity,
        price: Price,
    ) -> Option<ResponseEnvelope> {
        self.overseas_amend(
            AmendKind::Cancel,
            exchange.order_code(),
            order_id,
            symbol,
            quantity,
            price,
        )
        .await
    }

    pub async fn overseas_revise_order(
        &self,
        exchange: OverseasExchange,
        order_id: &str,
        symbol: &str,
        quantity: Quantity,
        price: Price,
    ) -> Option<ResponseEnvelope> {
        self.overseas_amend(
            AmendKind::Revise,
            exchange.order_code(),
            order_id,
            symbol,
            quantity,
            price,
        )
        .await
    }

    /// Cancel every unfilled overseas order except those on `skip_codes`.
    ///
    /// Each cancel is routed to the exchange the listing reports for it.
    pub async fn overseas_cancel_all(&self, skip_codes: &[String]) -> BulkCancelReport {
        let listing = self.overseas_outstanding_orders(None).await;
        let client = self;
        cancel_each(
            Market::Overseas,
            Some(listing),
            skip_codes,
            self.cancel_pause(),
            move |order: OverseasOrder| async move {
                client
                    .overseas_amend(
                        AmendKind::Cancel,
                        &order.exchange,
                        &order.order_id,
                        &order.code,
                        Quantity::new(order.quantity),
                        Price::new(order.price),
                    )
                    .await
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::client;
    use crate::bulk_cancel::CancelResult;
    use crate::signer::HASHKEY_PATH;
    use crate::transport::HttpResponse;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[tokio::test]
    async fn test_overseas_balance() {
        let (client, mock) = client(false);
        mock.respond_json(
            BALANCE_PATH,
            200,
            json!({
                "rt_cd": "0",
                "output1": [
                    {"ovrs_pdno": "AAPL", "ovrs_excg_cd": "NASD", "ovrs_cblc_qty": "3", "now_pric2": "187.25"},
                    {"ovrs_pdno": "TSLA", "ovrs_excg_cd": "NASD", "ovrs_cblc_qty": "0"}
                ],
                "output2": {"tot_evlu_pfls_amt": "12.50"}
            }),
        );

        let balance = client.overseas_balance(OverseasExchange::Nasdaq).await;
        assert_eq!(balance.total_profit, dec!(12.5));
        assert_eq!(balance.holdings.len(), 1);
        assert_eq!(balance.holdings[0].current_price, dec!(187.25));

        let req = &mock.requests()[0];
        assert_eq!(req.header("tr_id"), Some("TTTS3012R"));
        assert_eq!(req.query_value("OVRS_EXCG_CD"), Some("NASD"));
        assert_eq!(req.query_value("TR_CRCY_CD"), Some("USD"));
    }

    #[tokio::test]
    async fn test_overseas_balance_failure_is_empty() {
        let (client, mock) = client(true);
        mock.respond_json(BALANCE_PATH, 200, json!({"rt_cd": "7", "msg1": "no account"}));
        let balance = client.overseas_balance(OverseasExchange::Nyse).await;
        assert_eq!(balance, OverseasBalance::default());
        assert_eq!(mock.requests()[0].header("tr_id"), Some("VTTS3012R"));
    }

    #[tokio::test]
    async fn test_ticker_info_product_type_per_exchange() {
        let (client, mock) = client(false);
        mock.respond_json(TICKER_INFO_PATH, 200, json!({"rt_cd": "0", "output": {"prdt_name": "X"}}));
        for (exchange, code) in [
            (OverseasExchange::Nasdaq, "512"),
            (OverseasExchange::Nyse, "513"),
            (OverseasExchange::Amex, "529"),
        ] {
            mock.clear_requests();
            let info = client.overseas_ticker_info(exchange, "X").await.unwrap();
            assert_eq!(info["prdt_name"], "X");
            assert_eq!(mock.requests()[0].query_value("PRDT_TYPE_CD"), Some(code));
        }
    }

    #[tokio::test]
    async fn test_current_price_uses_quote_code() {
        let (client, mock) = client(false);
        mock.respond_json(PRICE_PATH, 200, json!({"rt_cd": "0", "output": {"last": "187.25"}}));
        let out = client
            .overseas_current_price(OverseasExchange::Amex, "SPY")
            .await
            .unwrap();
        assert_eq!(out["last"], "187.25");
        let req = &mock.requests()[0];
        assert_eq!(req.query_value("EXCD"), Some("AMS"));
        assert_eq!(req.query_value("SYMB"), Some("SPY"));
    }

    #[tokio::test]
    async fn test_condition_search_rows() {
        let (client, mock) = client(false);
        mock.respond_json(
            SEARCH_PATH,
            200,
            json!({"rt_cd": "0", "output2": [{"symb": "ABCD", "name": "Abcd", "last": "2.15", "rate": "35.2"}]}),
        );
        let rows = client.overseas_condition_search(OverseasExchange::Nasdaq).await;
        assert_eq!(rows[0].symbol, "ABCD");
        assert_eq!(rows[0].rate, dec!(35.2));
        assert_eq!(mock.requests()[0].query_value("CO_EN_PRICECUR"), Some("5"));
    }

    #[tokio::test]
    async fn test_paper_sell_routes_to_vttt1006u() {
        let (client, mock) = client(true);
        mock.respond_json(HASHKEY_PATH, 200, json!({"HASH": "h"}))
            .respond_json(ORDER_PATH, 200, json!({"rt_cd": "0"}));

        client
            .overseas_sell(OverseasExchange::Nasdaq, "AAPL", Quantity::new(2), Price::new(dec!(187.50)))
            .await
            .unwrap();

        let req = &mock.requests_to(ORDER_PATH)[0];
        assert_eq!(req.header("tr_id"), Some("VTTT1006U"));
        assert_eq!(req.header("hashkey"), Some("h"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["OVRS_EXCG_CD"], "NASD");
        assert_eq!(body["OVRS_ORD_UNPR"], "187.5");
        assert_eq!(body["ORD_DVSN"], "00");
    }

    #[tokio::test]
    async fn test_overseas_cancel_all_uses_row_exchange() {
        let (client, mock) = client(false);
        mock.respond_json(
            OUTSTANDING_PATH,
            200,
            json!({"rt_cd": "0", "output": [
                {"odno": "1", "pdno": "AAPL", "ft_ord_qty": "2", "ft_ord_unpr3": "180.00", "ovrs_excg_cd": "NASD"},
                {"odno": "2", "pdno": "IBM", "ft_ord_qty": "1", "ft_ord_unpr3": "150", "ovrs_excg_cd": "NYSE"},
                {"odno": "3", "pdno": "TSLA", "ft_ord_qty": "1", "ft_ord_unpr3": "200", "ovrs_excg_cd": "NASD"}
            ]}),
        )
        .respond_json(HASHKEY_PATH, 200, json!({"HASH": "h"}))
        .respond_json(AMEND_PATH, 200, json!({"rt_cd": "0"}))
        .respond(AMEND_PATH, HttpResponse::new(500, ""));

        let report = client.overseas_cancel_all(&["TSLA".to_string()]).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.outcomes[0].result, CancelResult::Accepted);
        assert_eq!(report.outcomes[1].result, CancelResult::NoResponse);

        let outstanding = &mock.requests_to(OUTSTANDING_PATH)[0];
        assert_eq!(outstanding.query_value("OVRS_EXCG_CD"), Some(""));
        assert_eq!(outstanding.query_value("SORT_SQN"), Some("DS"));

        let cancels = mock.requests_to(AMEND_PATH);
        assert_eq!(cancels[0].header("tr_id"), Some("TTTT1004U"));
        let second: Value = serde_json::from_str(cancels[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(second["OVRS_EXCG_CD"], "NYSE");
        assert_eq!(second["PDNO"], "IBM");
        assert_eq!(second["RVSE_CNCL_DVSN_CD"], "02");
        assert_eq!(second["OVRS_ORD_UNPR"], "150");
    }

    #[tokio::test]
    async fn test_finished_orders_today() {
        let (client, mock) = client(false);
        mock.respond_json(
            FINISHED_PATH,
            200,
            json!({"rt_cd": "0", "output": [{"odno": "5", "pdno": "AAPL", "ft_ccld_qty": "2", "ft_ccld_unpr3": "181"}]}),
        );
        let fills = client.overseas_finished_orders(OverseasExchange::Nasdaq).await;
        assert_eq!(fills[0].fill_quantity, 2);
        let req = &mock.requests()[0];
        assert_eq!(req.query_value("ORD_STRT_DT"), Some(today().as_str()));
        assert_eq!(req.query_value("PDNO"), Some("%"));
    }
}
