//! Response envelope.
//!
//! Uniform interpretation of an HTTP 200 response body. Success means the
//! `rt_cd` field is the string `"0"`; any other value, a missing field or an
//! undecodable body is a failure, never a panic. `into_result` gives the
//! tagged form.

use crate::error::{ClientError, ClientResult};
use crate::headers;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Value of `rt_cd` that marks success.
pub const SUCCESS_CODE: &str = "0";

const CODE_FIELD: &str = "rt_cd";
const MESSAGE_CODE_FIELD: &str = "msg_cd";
const MESSAGE_FIELD: &str = "msg1";

/// Whether a mutating call went out with a hash-key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureState {
    /// Read-only call, or signing not requested.
    #[default]
    NotRequired,
    Signed,
    /// Signing was requested but no hash-key was issued.
    Unsigned,
}

/// Logical failure reported by the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upstream failure {code}: {message}")]
pub struct ApiFailure {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    status_code: u16,
    headers: HeaderMap,
    body: Value,
    success_code: Option<String>,
    message_code: String,
    message: String,
    signature: SignatureState,
}

impl ResponseEnvelope {
    /// Build from a raw HTTP 200 exchange.
    ///
    /// Header names arrive lower-cased from the HTTP stack. A body that is
    /// not JSON is kept as `Value::Null` and the envelope reports failure.
    pub fn from_raw(
        status_code: u16,
        headers: HeaderMap,
        raw_body: &str,
        signature: SignatureState,
    ) -> Self {
        let body = serde_json::from_str(raw_body).unwrap_or_else(|e| {
            warn!(error = %e, "Response body is not JSON");
            Value::Null
        });
        let mut envelope = Self::from_json(body);
        envelope.status_code = status_code;
        envelope.headers = headers;
        envelope.signature = signature;
        envelope
    }

    /// Build from an already decoded body.
    pub fn from_json(body: Value) -> Self {
        let text = |field: &str| match body.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let success_code = match body.get(CODE_FIELD) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        let message_code = text(MESSAGE_CODE_FIELD).unwrap_or_default();
        let message = text(MESSAGE_FIELD).unwrap_or_default();
        Self {
            status_code: 200,
            headers: HeaderMap::new(),
            body,
            success_code,
            message_code,
            message,
            signature: SignatureState::NotRequired,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success_code.as_deref() == Some(SUCCESS_CODE)
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        headers::text(&self.headers, name)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// `rt_cd`, empty when absent.
    pub fn error_code(&self) -> &str {
        self.success_code.as_deref().unwrap_or_default()
    }

    /// `msg_cd`, empty when absent.
    pub fn message_code(&self) -> &str {
        &self.message_code
    }

    /// `msg1`, empty when absent.
    pub fn error_message(&self) -> &str {
        &self.message
    }

    pub fn signature(&self) -> SignatureState {
        self.signature
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Tagged form: the body on success, code and message otherwise.
    pub fn into_result(self) -> Result<Value, ApiFailure> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(ApiFailure {
                code: self.success_code.unwrap_or_default(),
                message: self.message,
            })
        }
    }

    /// Schema-validated decode of one top-level field.
    pub fn decode_field<T: DeserializeOwned>(&self, name: &str) -> ClientResult<T> {
        let value = self
            .field(name)
            .ok_or_else(|| ClientError::Decode(format!("missing field {name}")))?;
        T::deserialize(value).map_err(|e| ClientError::Decode(format!("field {name}: {e}")))
    }

    /// Decode a list-of-records field; any failure yields an empty list.
    pub fn records<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        match self.decode_field::<Vec<T>>(name) {
            Ok(rows) => rows,
            Err(e) => {
                debug!(error = %e, "No records decoded");
                Vec::new()
            }
        }
    }

    /// Log the failure code and message.
    pub fn log_failure(&self, tr_id: &str) {
        warn!(
            tr_id,
            code = self.error_code(),
            msg_cd = self.message_code(),
            message = self.error_message(),
            "Upstream reported failure"
        );
    }
}
