//! Client for the KIS (Korea Investment & Securities) trading REST API.
//!
//! Authenticates once, signs mutating calls with a server-issued hash key,
//! and routes every request to the live or paper environment.
//!
//! # Key Components
//!
//! - [`Session`]: credentials, access token and streaming approval key
//! - [`HashKeySigner`]: `/uapi/hashkey` round trip for order bodies
//! - [`Dispatcher`]: the single request/response pipeline
//! - [`ResponseEnvelope`]: `rt_cd`/`msg_cd`/`msg1` view of every reply
//! - [`KisClient`]: domestic, overseas and futures/options operations
//! - [`cancel_each`]: paced bulk cancellation with an aggregate report
//! - [`stream`]: websocket subscription payloads
//!
//! # Dispatch pipeline
//!
//! 1. tr_id rewritten for paper trading (T/J/C → V)
//! 2. headers copied from the session template
//! 3. hash key attached to signed POST bodies
//! 4. non-200 → error, 200 → envelope (success decided by `rt_cd == "0"`)

pub mod api;
pub mod bulk_cancel;
pub mod client;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod headers;
pub mod models;
pub mod pacer;
pub mod session;
pub mod signer;
pub mod stream;
pub mod transport;

// Error types
pub use error::{ClientError, ClientResult};

// Session and signing
pub use session::{EnvCredentials, Session, SessionConfig};
pub use signer::{HashKeySigner, SignOutcome};

// Dispatch
pub use dispatcher::{Dispatcher, RequestContext, SigningPolicy};
pub use envelope::{ApiFailure, ResponseEnvelope, SignatureState};

// Transport
pub use transport::{
    DynTransport, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockTransport,
    ReqwestTransport,
};

// Operations
pub use api::{FuturesPriceType, PricePeriod};
pub use bulk_cancel::{cancel_each, BulkCancelReport, BulkCancelState, CancelOutcome, CancelResult};
pub use client::{ClientOptions, KisClient};
pub use pacer::RequestPacer;
pub use stream::{build_payload, fill_notice_command, resolve_command, StreamCommand};
