//! Credential/session management.
//!
//! Selects the live or paper credential set once, runs the two credential
//! exchanges (streaming approval key, then access token) and freezes the
//! base header template reused by every call. Any failure here is fatal:
//! the client cannot be constructed without a session.

use crate::error::{ClientError, ClientResult};
use crate::headers::{self, APPKEY, APPSECRET, CHARSET};
use crate::transport::{HttpRequest, HttpTransport};
use kis_core::{SecretString, TradingEnv};
use kis_telemetry::Metrics;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

pub const TOKEN_PATH: &str = "/oauth2/tokenP";
pub const APPROVAL_PATH: &str = "/oauth2/Approval";

/// Authentication scheme prefixed to the access token.
const BEARER: &str = "Bearer";

/// Credentials and accounts for one environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvCredentials {
    pub base_url: String,
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub stock_account_number: String,
    #[serde(default)]
    pub futures_account_number: String,
}

/// Raw session configuration for both environments.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub live: EnvCredentials,
    pub paper: EnvCredentials,
    #[serde(default)]
    pub is_paper_trading: bool,
    pub user_agent: String,
    #[serde(default)]
    pub hts_id: String,
    #[serde(default = "default_custtype")]
    pub custtype: String,
}

fn default_custtype() -> String {
    "P".to_string()
}

impl SessionConfig {
    pub fn env(&self) -> TradingEnv {
        TradingEnv::from_paper_flag(self.is_paper_trading)
    }

    /// Credential set for the selected environment.
    pub fn credentials(&self) -> &EnvCredentials {
        match self.env() {
            TradingEnv::Live => &self.live,
            TradingEnv::Paper => &self.paper,
        }
    }

    /// Check that the selected environment is usable.
    pub fn validate(&self) -> ClientResult<()> {
        let creds = self.credentials();
        let env = self.env();
        let missing = [
            ("base_url", creds.base_url.is_empty()),
            ("api_key", creds.api_key.is_empty()),
            ("api_secret", creds.api_secret.is_empty()),
            ("stock_account_number", creds.stock_account_number.is_empty()),
        ];
        if let Some((field, _)) = missing.iter().find(|(_, empty)| *empty) {
            return Err(ClientError::Config(format!("{env}.{field} is empty")));
        }
        Ok(())
    }
}

/// An authenticated session. Immutable once built.
#[derive(Debug, Clone)]
pub struct Session {
    env: TradingEnv,
    base_url: String,
    headers: HeaderMap,
    access_token: SecretString,
    approval_key: SecretString,
    account_number: String,
    futures_account_number: String,
    hts_id: String,
    custtype: String,
}

impl Session {
    /// Authenticate against the selected environment.
    pub async fn establish(
        config: &SessionConfig,
        transport: &dyn HttpTransport,
    ) -> ClientResult<Self> {
        config.validate()?;
        let creds = config.credentials();
        let base_url = creds.base_url.trim_end_matches('/');
        let base_headers = base_headers(&config.user_agent)?;

        let approval_key =
            acquire_websocket_approval(transport, base_url, &creds.api_key, &creds.api_secret)
                .await?;
        let access_token = acquire_access_token(
            transport,
            base_url,
            &base_headers,
            &creds.api_key,
            &creds.api_secret,
        )
        .await?;

        info!(env = %config.env(), base_url, "Session established");
        Metrics::session_established(&config.env().to_string());
        Self::from_parts(config, access_token, approval_key)
    }

    /// Build a session from already issued secrets. No network calls.
    pub fn from_parts(
        config: &SessionConfig,
        access_token: SecretString,
        approval_key: SecretString,
    ) -> ClientResult<Self> {
        config.validate()?;
        let creds = config.credentials();
        let mut headers = base_headers(&config.user_agent)?;
        headers::insert_sensitive(&mut headers, "authorization", access_token.expose())?;
        headers::insert_sensitive(&mut headers, APPKEY, creds.api_key.expose())?;
        headers::insert_sensitive(&mut headers, APPSECRET, creds.api_secret.expose())?;

        Ok(Self {
            env: config.env(),
            base_url: creds.base_url.trim_end_matches('/').to_string(),
            headers,
            access_token,
            approval_key,
            account_number: creds.stock_account_number.clone(),
            futures_account_number: creds.futures_account_number.clone(),
            hts_id: config.hts_id.clone(),
            custtype: config.custtype.clone(),
        })
    }

    pub fn env(&self) -> TradingEnv {
        self.env
    }

    pub fn is_paper_trading(&self) -> bool {
        self.env.is_paper()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A per-request copy of the base headers.
    pub fn header_template(&self) -> HeaderMap {
        self.headers.clone()
    }

    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub fn approval_key(&self) -> &SecretString {
        &self.approval_key
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn futures_account_number(&self) -> &str {
        &self.futures_account_number
    }

    pub fn hts_id(&self) -> &str {
        &self.hts_id
    }

    pub fn custtype(&self) -> &str {
        &self.custtype
    }
}

fn base_headers(user_agent: &str) -> ClientResult<HeaderMap> {
    let mut headers = json_headers();
    headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
    headers.insert(CHARSET, HeaderValue::from_static("UTF-8"));
    headers::insert(&mut headers, "user-agent", user_agent)?;
    Ok(headers)
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Client-credentials grant. Returns `"Bearer <token>"`.
pub async fn acquire_access_token(
    transport: &dyn HttpTransport,
    base_url: &str,
    headers: &HeaderMap,
    api_key: &SecretString,
    api_secret: &SecretString,
) -> ClientResult<SecretString> {
    let body = json!({
        "grant_type": "client_credentials",
        "appkey": api_key.expose(),
        "appsecret": api_secret.expose(),
    });
    let request = HttpRequest::post(
        format!("{base_url}{TOKEN_PATH}"),
        headers.clone(),
        body.to_string(),
    );
    let token = exchange(transport, request, "token", "access_token").await?;
    Ok(SecretString::new(format!("{BEARER} {token}")))
}

/// Streaming approval-key exchange. The key is used as-is.
pub async fn acquire_websocket_approval(
    transport: &dyn HttpTransport,
    base_url: &str,
    api_key: &SecretString,
    api_secret: &SecretString,
) -> ClientResult<SecretString> {
    let body = json!({
        "grant_type": "client_credentials",
        "appkey": api_key.expose(),
        "secretkey": api_secret.expose(),
    });
    let request = HttpRequest::post(
        format!("{base_url}{APPROVAL_PATH}"),
        json_headers(),
        body.to_string(),
    );
    let key = exchange(transport, request, "approval", "approval_key").await?;
    Ok(SecretString::new(key))
}

async fn exchange(
    transport: &dyn HttpTransport,
    request: HttpRequest,
    stage: &'static str,
    field: &str,
) -> ClientResult<String> {
    let fail = |message: String| {
        error!(stage, %message, "Credential exchange failed");
        Metrics::auth_failure(stage);
        ClientError::Authentication { stage, message }
    };

    let response = transport
        .execute(request)
        .await
        .map_err(|e| fail(e.to_string()))?;
    if !response.is_success() {
        return Err(fail(format!("HTTP {}: {}", response.status, response.body)));
    }

    let body: serde_json::Value =
        serde_json::from_str(&response.body).map_err(|e| fail(format!("invalid JSON: {e}")))?;
    body.get(field)
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| fail(format!("response has no {field}")))
}
