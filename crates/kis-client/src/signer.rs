//! Hash-key request signer.
//!
//! Mutating calls must carry a server-issued hash of their exact body.
//! The signer posts the body to the hash-key endpoint with the request's
//! own headers and, on HTTP 200, adds a `hashkey` header. A non-200
//! answer leaves the headers untouched and reports the degradation. An
//! HTTP 200 without a usable `HASH` is an error, so nothing is sent.

use crate::error::{ClientError, ClientResult};
use crate::headers;
use crate::transport::{DynTransport, HttpRequest};
use reqwest::header::HeaderMap;
use tracing::{debug, warn};

pub const HASHKEY_PATH: &str = "/uapi/hashkey";

/// Result of a signing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// `hashkey` was added to the headers.
    Signed,
    /// Non-200 reply; headers are unchanged.
    Degraded { status: u16, reason: String },
}

impl SignOutcome {
    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Signed)
    }
}

pub struct HashKeySigner {
    transport: DynTransport,
    url: String,
}

impl HashKeySigner {
    pub fn new(transport: DynTransport, base_url: &str) -> Self {
        Self {
            transport,
            url: format!("{base_url}{HASHKEY_PATH}"),
        }
    }

    /// Sign `body` in place on `headers`.
    ///
    /// `headers` must be the caller's per-request copy. A non-200 refusal
    /// is `Degraded`; a transport failure or an HTTP 200 body without a
    /// `HASH` string is an error.
    pub async fn sign(&self, headers: &mut HeaderMap, body: &str) -> ClientResult<SignOutcome> {
        let request = HttpRequest::post(&self.url, headers.clone(), body.to_string());
        let response = self.transport.execute(request).await?;

        if response.status != 200 {
            warn!(
                status = response.status,
                body = %response.body,
                "Hash-key request rejected"
            );
            return Ok(SignOutcome::Degraded {
                status: response.status,
                reason: format!("HTTP {}", response.status),
            });
        }

        let hash = serde_json::from_str::<serde_json::Value>(&response.body)
            .ok()
            .and_then(|v| v.get("HASH").and_then(|h| h.as_str()).map(str::to_string))
            .ok_or_else(|| {
                warn!(body = %response.body, "Hash-key response has no HASH field");
                ClientError::Decode("hash-key response has no HASH field".to_string())
            })?;
        headers::insert(headers, headers::HASHKEY, &hash)?;
        debug!("Hash-key issued");
        Ok(SignOutcome::Signed)
    }
}
