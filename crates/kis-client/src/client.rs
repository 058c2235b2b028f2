//! Client facade.
//!
//! `KisClient` owns the dispatcher and exposes every domestic, overseas
//! and futures/options operation (see `api`). Construction authenticates
//! once; after that every call is a single sequential round trip (two for
//! signed orders).

use crate::dispatcher::{Dispatcher, RequestContext, SigningPolicy};
use crate::envelope::ResponseEnvelope;
use crate::error::ClientResult;
use crate::pacer::DEFAULT_CANCEL_PAUSE;
use crate::session::{Session, SessionConfig};
use crate::stream;
use crate::transport::{DynTransport, ReqwestTransport, DEFAULT_TIMEOUT};
use kis_core::{Market, TradingEnv};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Tunables that are not credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub request_timeout: Duration,
    /// Pause between consecutive bulk-cancel requests.
    pub cancel_pause: Duration,
    pub signing_policy: SigningPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            cancel_pause: DEFAULT_CANCEL_PAUSE,
            signing_policy: SigningPolicy::default(),
        }
    }
}

pub struct KisClient {
    dispatcher: Dispatcher,
    cancel_pause: Duration,
}

impl KisClient {
    /// Authenticate over HTTPS and build a client.
    pub async fn connect(config: &SessionConfig, options: ClientOptions) -> ClientResult<Self> {
        let transport: DynTransport = Arc::new(ReqwestTransport::new(options.request_timeout)?);
        Self::connect_with(config, options, transport).await
    }

    /// Authenticate over the given transport and build a client.
    pub async fn connect_with(
        config: &SessionConfig,
        options: ClientOptions,
        transport: DynTransport,
    ) -> ClientResult<Self> {
        let session = Session::establish(config, transport.as_ref()).await?;
        Ok(Self::from_session(session, transport, options))
    }

    pub fn from_session(session: Session, transport: DynTransport, options: ClientOptions) -> Self {
        info!(
            env = %session.env(),
            policy = ?options.signing_policy,
            timeout_ms = options.request_timeout.as_millis() as u64,
            "KIS client ready"
        );
        Self {
            dispatcher: Dispatcher::new(Arc::new(session), transport, options.signing_policy),
            cancel_pause: options.cancel_pause,
        }
    }

    pub fn session(&self) -> &Session {
        self.dispatcher.session()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn env(&self) -> TradingEnv {
        self.dispatcher.env()
    }

    pub fn cancel_pause(&self) -> Duration {
        self.cancel_pause
    }

    /// Streaming subscription payload for this session.
    pub fn stream_payload(
        &self,
        market: Market,
        cmd: u8,
        instrument: Option<&str>,
    ) -> ClientResult<String> {
        stream::build_payload(self.session(), market, cmd, instrument)
    }

    /// Dispatch and keep only success-coded envelopes.
    pub(crate) async fn fetch_ok(&self, ctx: RequestContext) -> Option<ResponseEnvelope> {
        self.dispatcher
            .dispatch(ctx)
            .await
            .filter(ResponseEnvelope::is_success)
    }

    /// Dispatch an order; failure-coded envelopes are returned as-is.
    pub(crate) async fn submit(&self, ctx: RequestContext) -> Option<ResponseEnvelope> {
        self.dispatcher.dispatch(ctx).await
    }
}
