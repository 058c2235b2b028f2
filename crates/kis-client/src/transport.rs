//! HTTP transport seam.
//!
//! Abstracts the single HTTP round trip so the session, signer and
//! dispatcher can be exercised against a scripted mock:
//! - `ReqwestTransport`: production transport with an explicit timeout
//! - `MockTransport`: scripted replies keyed by URL path, records requests

use crate::error::{ClientError, ClientResult};
use crate::headers;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Default client-wide request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A fully built outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    /// Query parameters, in order (GET only).
    pub query: Vec<(String, String)>,
    /// Pre-serialized JSON body (POST only).
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, headers: HeaderMap, query: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers,
            query,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, headers: HeaderMap, body: String) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        headers::text(&self.headers, name)
    }
}

/// Raw response as received from the wire.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are normalized to lower case by the HTTP stack.
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One HTTP round trip.
///
/// Connection, DNS, timeout and body-read failures surface as
/// `ClientError::Transport`. Any status code is a successful round trip.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>>;
}

/// Arc wrapper for HttpTransport trait objects.
pub type DynTransport = Arc<dyn HttpTransport>;

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url).query(&request.query),
                HttpMethod::Post => self.client.post(&request.url),
            }
            .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| ClientError::Transport(format!("HTTP request failed: {e}")))?;

            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response
                .text()
                .await
                .map_err(|e| ClientError::Transport(format!("Failed to read body: {e}")))?;

            trace!(status, "HTTP response received");
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Respond(HttpResponse),
    Fail(String),
}

/// Scripted transport for tests.
///
/// Replies are queued per URL path. The last queued reply for a path is
/// sticky; unscripted paths answer 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `path`.
    pub fn respond(&self, path: &str, response: HttpResponse) -> &Self {
        self.push(path, MockReply::Respond(response));
        self
    }

    /// Queue a JSON reply for `path`.
    pub fn respond_json(&self, path: &str, status: u16, body: serde_json::Value) -> &Self {
        self.respond(path, HttpResponse::new(status, body.to_string()))
    }

    /// Queue a transport failure for `path`.
    pub fn fail(&self, path: &str, message: &str) -> &Self {
        self.push(path, MockReply::Fail(message.to_string()));
        self
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose URL ends with `path`.
    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn push(&self, path: &str, reply: MockReply) {
        self.replies
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, url: &str) -> Option<MockReply> {
        let mut replies = self.replies.lock();
        let (_, queue) = replies
            .iter_mut()
            .filter(|(path, _)| url.ends_with(path.as_str()))
            .max_by_key(|(path, _)| path.len())?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl HttpTransport for MockTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>> {
        Box::pin(async move {
            let reply = self.next_reply(&request.url);
            self.requests.lock().push(request);
            match reply {
                Some(MockReply::Respond(response)) => Ok(response),
                Some(MockReply::Fail(message)) => Err(ClientError::Transport(message)),
                None => Ok(HttpResponse::new(404, "")),
            }
        })
    }
}
