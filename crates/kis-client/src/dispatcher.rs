//! Request dispatcher.
//!
//! The generic request/response pipeline every operation goes through:
//! 1. URL = session base URL + path
//! 2. transaction id routed to the session's environment
//! 3. per-request header copy + `tr_id` + `custtype`
//! 4. hash-key signing for signed mutating calls
//! 5. POST with JSON body, or GET with query string
//! 6. HTTP 200 → `ResponseEnvelope`; anything else is an error
//!
//! `try_dispatch` returns the error; `dispatch` logs it and yields `None`.
//! One request is in flight at a time per call; nothing here is shared
//! mutably between calls.

use crate::envelope::{ResponseEnvelope, SignatureState};
use crate::error::{ClientError, ClientResult};
use crate::headers::{self, CUSTTYPE, TR_ID};
use crate::session::Session;
use crate::signer::{HashKeySigner, SignOutcome};
use crate::transport::{DynTransport, HttpRequest};
use kis_core::{rewrite_tr_id, TradingEnv, TrKey};
use kis_telemetry::{DispatchOutcome, Metrics};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// What to do when a mutating call cannot be signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningPolicy {
    /// Send unsigned and mark the envelope `SignatureState::Unsigned`.
    #[default]
    Lenient,
    /// Fail the call with `ClientError::SigningFailed`.
    Strict,
}

/// One call's routing and parameters. Consumed by dispatch.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub path: String,
    /// Live transaction id; rewritten for paper trading at dispatch.
    pub tr_id: String,
    /// Parameters in upstream-documented order.
    pub params: Map<String, Value>,
    pub is_mutating: bool,
    pub requires_signature: bool,
}

impl RequestContext {
    /// Read-only GET.
    pub fn query(path: &str, tr_id: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            tr_id: tr_id.into(),
            params: Map::new(),
            is_mutating: false,
            requires_signature: false,
        }
    }

    /// Signed POST.
    pub fn order(path: &str, tr_id: impl Into<String>) -> Self {
        Self {
            is_mutating: true,
            requires_signature: true,
            ..Self::query(path, tr_id)
        }
    }

    pub fn for_key(path: &str, key: TrKey) -> Self {
        if key.is_order() {
            Self::order(path, key.live_code())
        } else {
            Self::query(path, key.live_code())
        }
    }

    /// Append a string parameter.
    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params
            .insert(name.to_string(), Value::String(value.into()));
        self
    }

    /// Append several parameters.
    pub fn params<'a, V: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (&'a str, V)>,
    ) -> Self {
        for (name, value) in pairs {
            self = self.param(name, value);
        }
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.requires_signature = false;
        self
    }

    /// Canonical JSON body; also the exact string the hash-key covers.
    pub fn body(&self) -> ClientResult<String> {
        Ok(serde_json::to_string(&self.params)?)
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

pub struct Dispatcher {
    session: Arc<Session>,
    transport: DynTransport,
    signer: HashKeySigner,
    policy: SigningPolicy,
}

impl Dispatcher {
    pub fn new(session: Arc<Session>, transport: DynTransport, policy: SigningPolicy) -> Self {
        let signer = HashKeySigner::new(transport.clone(), session.base_url());
        Self {
            session,
            transport,
            signer,
            policy,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn env(&self) -> TradingEnv {
        self.session.env()
    }

    pub fn policy(&self) -> SigningPolicy {
        self.policy
    }

    /// Dispatch, collapsing every failure to `None` after logging it.
    pub async fn dispatch(&self, ctx: RequestContext) -> Option<ResponseEnvelope> {
        let path = ctx.path.clone();
        match self.try_dispatch(ctx).await {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                warn!(path = %path, error = %e, "Dispatch failed");
                None
            }
        }
    }

    /// Dispatch, returning the failure.
    pub async fn try_dispatch(&self, ctx: RequestContext) -> ClientResult<ResponseEnvelope> {
        let tr_id = rewrite_tr_id(&ctx.tr_id, self.env()).into_owned();
        let result = self.execute(ctx, &tr_id).await;

        let outcome = match &result {
            Ok(env) if env.is_success() => DispatchOutcome::Ok,
            Ok(_) => DispatchOutcome::LogicalFailure,
            Err(ClientError::HttpStatus { .. }) => DispatchOutcome::HttpStatus,
            Err(ClientError::SigningFailed(_)) => DispatchOutcome::SigningFailed,
            Err(_) => DispatchOutcome::Transport,
        };
        Metrics::dispatch(outcome, &tr_id);
        result
    }

    async fn execute(&self, ctx: RequestContext, tr_id: &str) -> ClientResult<ResponseEnvelope> {
        let url = format!("{}{}", self.session.base_url(), ctx.path);
        let mut headers = self.session.header_template();
        headers::insert(&mut headers, TR_ID, tr_id)?;
        headers::insert(&mut headers, CUSTTYPE, self.session.custtype())?;

        let mut signature = SignatureState::NotRequired;
        let request = if ctx.is_mutating {
            let body = ctx.body()?;
            if ctx.requires_signature {
                signature = match self.signer.sign(&mut headers, &body).await? {
                    SignOutcome::Signed => SignatureState::Signed,
                    SignOutcome::Degraded { reason, .. } => {
                        Metrics::hashkey_degraded(tr_id);
                        if self.policy == SigningPolicy::Strict {
                            return Err(ClientError::SigningFailed(reason));
                        }
                        warn!(tr_id, %reason, "Sending order without hash-key");
                        SignatureState::Unsigned
                    }
                };
            }
            HttpRequest::post(url, headers, body)
        } else {
            HttpRequest::get(url, headers, ctx.query_pairs())
        };

        let method = request.method.to_string();
        debug!(tr_id, path = %ctx.path, method = %method, "Dispatching");
        let started = Instant::now();
        let response = self.transport.execute(request).await?;
        Metrics::request_latency(&method, started.elapsed().as_secs_f64() * 1000.0);

        if response.status != 200 {
            return Err(ClientError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }

        let envelope =
            ResponseEnvelope::from_raw(response.status, response.headers, &response.body, signature);
        if !envelope.is_success() {
            envelope.log_failure(tr_id);
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::test_session;
    use crate::signer::HASHKEY_PATH;
    use crate::transport::{HttpMethod, HttpResponse, MockTransport};
    use serde_json::json;

    const ORDER_PATH: &str = "/uapi/domestic-stock/v1/trading/order-cash";
    const BALANCE_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-balance";

    fn dispatcher(paper: bool, mock: &Arc<MockTransport>, policy: SigningPolicy) -> Dispatcher {
        Dispatcher::new(Arc::new(test_session(paper)), mock.clone(), policy)
    }

    fn order_ctx() -> RequestContext {
        RequestContext::order(ORDER_PATH, "TTTC0012U")
            .param("CANO", "55556666")
            .param("PDNO", "005930")
            .param("ORD_QTY", "10")
    }

    #[tokio::test]
    async fn test_paper_order_is_rewritten_signed_and_posted() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(HASHKEY_PATH, 200, json!({"HASH": "h1"}))
            .respond_json(ORDER_PATH, 200, json!({"rt_cd": "0", "msg1": "ok"}));
        let d = dispatcher(true, &mock, SigningPolicy::Lenient);

        let env = d.dispatch(order_ctx()).await.unwrap();
        assert!(env.is_success());
        assert_eq!(env.signature(), SignatureState::Signed);

        let hash_req = &mock.requests_to(HASHKEY_PATH)[0];
        let order_req = &mock.requests_to(ORDER_PATH)[0];
        assert_eq!(order_req.method, HttpMethod::Post);
        assert_eq!(order_req.url, format!("https://paper.example{ORDER_PATH}"));
        assert_eq!(order_req.header("tr_id"), Some("VTTC0012U"));
        assert_eq!(order_req.header("custtype"), Some("P"));
        assert_eq!(order_req.header("hashkey"), Some("h1"));
        // signed bytes == sent bytes
        assert_eq!(hash_req.body, order_req.body);
        assert_eq!(
            order_req.body.as_deref(),
            Some(r#"{"CANO":"55556666","PDNO":"005930","ORD_QTY":"10"}"#)
        );
    }

    #[tokio::test]
    async fn test_get_sends_query_without_signing() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(BALANCE_PATH, 200, json!({"rt_cd": "0"}));
        let d = dispatcher(false, &mock, SigningPolicy::Lenient);

        let ctx = RequestContext::query(BALANCE_PATH, "TTTC8434R")
            .param("CANO", "11112222")
            .param("AFHR_FLPR_YN", "N");
        let env = d.dispatch(ctx).await.unwrap();
        assert_eq!(env.signature(), SignatureState::NotRequired);

        let req = &mock.requests()[0];
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.header("tr_id"), Some("TTTC8434R"));
        assert_eq!(req.query_value("CANO"), Some("11112222"));
        assert!(req.body.is_none());
        assert!(mock.requests_to(HASHKEY_PATH).is_empty());
    }

    #[tokio::test]
    async fn test_non_200_is_absent() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(BALANCE_PATH, HttpResponse::new(500, "internal"));
        let d = dispatcher(false, &mock, SigningPolicy::Lenient);

        let ctx = RequestContext::query(BALANCE_PATH, "TTTC8434R");
        assert!(d.dispatch(ctx.clone()).await.is_none());
        assert!(matches!(
            d.try_dispatch(ctx).await.unwrap_err(),
            ClientError::HttpStatus { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_is_absent() {
        let mock = Arc::new(MockTransport::new());
        mock.fail(BALANCE_PATH, "connection reset");
        let d = dispatcher(false, &mock, SigningPolicy::Lenient);
        assert!(d
            .dispatch(RequestContext::query(BALANCE_PATH, "TTTC8434R"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_logical_failure_still_returns_envelope() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(BALANCE_PATH, 200, json!({"rt_cd": "7", "msg1": "bad account"}));
        let d = dispatcher(false, &mock, SigningPolicy::Lenient);

        let env = d
            .dispatch(RequestContext::query(BALANCE_PATH, "TTTC8434R"))
            .await
            .unwrap();
        assert!(!env.is_success());
        assert_eq!(env.error_code(), "7");
        assert_eq!(env.error_message(), "bad account");
    }

    #[tokio::test]
    async fn test_lenient_policy_sends_unsigned() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(HASHKEY_PATH, HttpResponse::new(403, ""))
            .respond_json(ORDER_PATH, 200, json!({"rt_cd": "1", "msg1": "hash mismatch"}));
        let d = dispatcher(false, &mock, SigningPolicy::Lenient);

        let env = d.dispatch(order_ctx()).await.unwrap();
        assert_eq!(env.signature(), SignatureState::Unsigned);
        let order_req = &mock.requests_to(ORDER_PATH)[0];
        assert!(!order_req.headers.contains_key("hashkey"));
    }

    #[tokio::test]
    async fn test_hashkey_200_without_hash_sends_nothing() {
        for reply in [json!({"BODY": {}}).to_string(), "not json".to_string()] {
            let mock = Arc::new(MockTransport::new());
            mock.respond(HASHKEY_PATH, HttpResponse::new(200, reply))
                .respond_json(ORDER_PATH, 200, json!({"rt_cd": "0"}));
            let d = dispatcher(false, &mock, SigningPolicy::Lenient);

            assert!(d.dispatch(order_ctx()).await.is_none());
            assert_eq!(mock.requests_to(HASHKEY_PATH).len(), 1);
            assert!(mock.requests_to(ORDER_PATH).is_empty());
        }
    }

    #[tokio::test]
    async fn test_strict_policy_refuses_unsigned() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(HASHKEY_PATH, HttpResponse::new(403, ""));
        let d = dispatcher(false, &mock, SigningPolicy::Strict);

        let err = d.try_dispatch(order_ctx()).await.unwrap_err();
        assert!(matches!(err, ClientError::SigningFailed(_)));
        assert!(mock.requests_to(ORDER_PATH).is_empty());
    }

    #[tokio::test]
    async fn test_signing_transport_failure_is_absent() {
        let mock = Arc::new(MockTransport::new());
        mock.fail(HASHKEY_PATH, "timeout");
        let d = dispatcher(false, &mock, SigningPolicy::Lenient);
        assert!(d.dispatch(order_ctx()).await.is_none());
        assert!(mock.requests_to(ORDER_PATH).is_empty());
    }

    #[tokio::test]
    async fn test_unsigned_mutating_call_skips_signer() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(ORDER_PATH, 200, json!({"rt_cd": "0"}));
        let d = dispatcher(false, &mock, SigningPolicy::Strict);

        let env = d.dispatch(order_ctx().unsigned()).await.unwrap();
        assert_eq!(env.signature(), SignatureState::NotRequired);
        assert!(mock.requests_to(HASHKEY_PATH).is_empty());
    }

    #[tokio::test]
    async fn test_template_is_not_mutated_by_dispatch() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(HASHKEY_PATH, 200, json!({"HASH": "h1"}))
            .respond_json(ORDER_PATH, 200, json!({"rt_cd": "0"}));
        let d = dispatcher(false, &mock, SigningPolicy::Lenient);

        d.dispatch(order_ctx()).await.unwrap();
        let template = d.session().header_template();
        assert!(!template.contains_key("hashkey"));
        assert!(!template.contains_key("tr_id"));
    }

    #[test]
    fn test_for_key_picks_method() {
        let order = RequestContext::for_key(ORDER_PATH, TrKey::DomesticAmendCancel);
        assert!(order.is_mutating && order.requires_signature);
        let query = RequestContext::for_key(BALANCE_PATH, TrKey::DomesticBalance);
        assert!(!query.is_mutating);
        assert_eq!(query.tr_id, "TTTC8434R");
    }
}
