//! Application configuration.
//!
//! A TOML file layered with `KIS__`-prefixed environment variables
//! (`__` separates nesting levels), so credentials can stay out of files:
//!
//! ```text
//! KIS__SESSION__LIVE__API_SECRET=...  ->  session.live.api_secret
//! KIS__SESSION__IS_PAPER_TRADING=true ->  session.is_paper_trading
//! ```

use crate::error::AppResult;
use config::{Config, Environment, File, FileFormat};
use kis_client::{ClientOptions, SessionConfig, SigningPolicy};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "KIS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

const ENV_PREFIX: &str = "KIS";
const ENV_SEPARATOR: &str = "__";

/// Client tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Per-request timeout (ms). Default: 10,000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Pause between bulk-cancel requests (ms). Default: 20.
    #[serde(default = "default_cancel_pause_ms")]
    pub cancel_pause_ms: u64,
    /// What to do when an order cannot be signed. Default: lenient.
    #[serde(default)]
    pub signing_policy: SigningPolicy,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_cancel_pause_ms() -> u64 {
    20
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            cancel_pause_ms: default_cancel_pause_ms(),
            signing_policy: SigningPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            cancel_pause: Duration::from_millis(self.cancel_pause_ms),
            signing_policy: self.signing_policy,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub session: SessionConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl AppConfig {
    /// Config path: CLI arg > `KIS_CONFIG` > default.
    pub fn resolve_path(cli: Option<String>) -> String {
        cli.or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from a TOML file with process environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        Self::build(File::new(path, FileFormat::Toml), environment(None))
    }

    /// Load from TOML text with an explicit override map (no process env).
    pub fn from_toml_str(content: &str, overrides: config::Map<String, String>) -> AppResult<Self> {
        Self::build(
            File::from_str(content, FileFormat::Toml),
            environment(Some(overrides)),
        )
    }

    fn build<F>(file: F, env: Environment) -> AppResult<Self>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let config: Self = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        config.session.validate()?;
        Ok(config)
    }
}

fn environment(source: Option<config::Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .source(source)
}
