//! Client configuration
//!
//! Defaults target a local development hub on `localhost:8000`. Every field can be
//! overridden from the environment with [`FeedConfig::from_env`]:
//!
//! - `LIVE_FEED_ENV`: `development` (default) or `production`
//! - `LIVE_FEED_DEV_HOST`: hub host used in development (default `localhost:8000`)
//! - `LIVE_FEED_HOST`: host the application is served from, used in production
//! - `LIVE_FEED_SECURE`: `true` when served over TLS, selects `wss`
//! - `LIVE_FEED_API_URL`: base URL of the REST collaborator
//! - `LIVE_FEED_HISTORY_CAPACITY`: events kept by the history (default 50, at most 10000)
//! - `LIVE_FEED_CONNECT_TIMEOUT_SECS`: handshake timeout (default 10)
//! - `LIVE_FEED_REQUEST_TIMEOUT_SECS`: test-notification request timeout (default 10)
//! - `LIVE_FEED_SEND_TIMEOUT_SECS`: bound on one outbound write (default 10)
//! - `LIVE_FEED_RECONNECT_ATTEMPTS`: reconnect attempts after a drop (default 0, disabled)

use std::str::FromStr;
use std::time::Duration;

use crate::client::history::{DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY};
use crate::error::ConfigError;

/// Deployment environment, decides which host the websocket targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Reconnect behaviour after a connection drops while the token is unchanged.
///
/// With `max_attempts == 0` a dropped connection stays closed until the next
/// token change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl ReconnectPolicy {
    pub const fn disabled() -> Self {
        Self {
            max_attempts: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Exponential backoff starting at 500ms, capped at 30s
    pub const fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Delay before reconnect attempt `attempt` (0-based), `None` once exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        Some(self.initial_backoff.saturating_mul(factor).min(self.max_backoff))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Configuration for the client pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub environment: Environment,
    pub dev_host: String,
    pub page_host: String,
    pub secure: bool,
    pub api_base_url: String,
    pub history_capacity: usize,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Upper bound on one outbound write before the link counts as dropped
    pub send_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            dev_host: "localhost:8000".to_string(),
            page_host: "localhost:8000".to_string(),
            secure: false,
            api_base_url: "http://localhost:8000".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::disabled(),
        }
    }
}

impl FeedConfig {
    /// Config pointing both the websocket and the REST collaborator at `host`
    pub fn for_host(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            api_base_url: format!("http://{}", host),
            dev_host: host.clone(),
            page_host: host,
            ..Self::default()
        }
    }

    /// Build from defaults overlaid with `LIVE_FEED_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from defaults overlaid with values returned by `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(env) = get("LIVE_FEED_ENV") {
            config.environment = env.parse()?;
        }
        if let Some(host) = get("LIVE_FEED_DEV_HOST") {
            config.dev_host = host;
        }
        if let Some(host) = get("LIVE_FEED_HOST") {
            config.page_host = host;
        }
        if let Some(secure) = get("LIVE_FEED_SECURE") {
            config.secure = matches!(secure.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(url) = get("LIVE_FEED_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(capacity) = parse_number::<usize>(&get, "LIVE_FEED_HISTORY_CAPACITY") {
            config.history_capacity = capacity;
        }
        if let Some(secs) = parse_number::<u64>(&get, "LIVE_FEED_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number::<u64>(&get, "LIVE_FEED_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number::<u64>(&get, "LIVE_FEED_SEND_TIMEOUT_SECS") {
            config.send_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_number::<u32>(&get, "LIVE_FEED_RECONNECT_ATTEMPTS") {
            config.reconnect = ReconnectPolicy::bounded(attempts);
        }

        config.validate()?;
        Ok(config)
    }

    /// Host the websocket connects to in the configured environment
    pub fn ws_host(&self) -> &str {
        match self.environment {
            Environment::Development => &self.dev_host,
            Environment::Production => &self.page_host,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ws_host().trim().is_empty() {
            return Err(ConfigError::Empty { name: "websocket host" });
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Empty { name: "api base url" });
        }
        if self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(ConfigError::HistoryCapacity {
                value: self.history_capacity,
                max: MAX_HISTORY_CAPACITY,
            });
        }
        Ok(())
    }
}

/// Unparsable values are ignored with a warning and the default is kept
fn parse_number<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = get(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
