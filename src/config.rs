//! Configuration and credentials for the Bybit API client.
//!
//! This module provides the [`Config`] struct. A config is built once at
//! process start and passed by reference to the REST and WebSocket clients.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Default receive window in milliseconds
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5000;

/// API environment (mainnet or testnet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Mainnet (real money)
    #[default]
    Mainnet,
    /// Testnet (paper trading)
    Testnet,
}

impl Environment {
    /// Get the base URL for REST API
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Environment::Mainnet => "https://api.bybit.com",
            Environment::Testnet => "https://api-testnet.bybit.com",
        }
    }

    /// Get the private WebSocket URL
    pub fn private_ws_url(&self) -> &'static str {
        match self {
            Environment::Mainnet => "wss://stream.bybit.com/v5/private",
            Environment::Testnet => "wss://stream-testnet.bybit.com/v5/private",
        }
    }

    /// Get the public spot WebSocket URL
    pub fn public_ws_url(&self) -> &'static str {
        match self {
            Environment::Mainnet => "wss://stream.bybit.com/v5/public/spot",
            Environment::Testnet => "wss://stream-testnet.bybit.com/v5/public/spot",
        }
    }
}

/// Configuration for the Bybit API client
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use bybit_trading::Config;
/// use bybit_trading::config::Environment;
///
/// let config = Config::new("my-api-key", "my-secret")
///     .with_environment(Environment::Testnet)
///     .with_recv_window(10_000)
///     .with_timeout(Duration::from_secs(30));
///
/// assert!(config.rest_base_url().contains("testnet"));
/// ```
#[derive(Clone)]
pub struct Config {
    api_key: String,
    secret_key: String,
    environment: Environment,
    rest_url: Option<String>,
    private_ws_url: Option<String>,
    public_ws_url: Option<String>,
    recv_window_ms: u64,
    timeout: Duration,
    connect_timeout: Duration,
    auth_expiry: Duration,
    ping_interval: Option<Duration>,
    topics: Vec<String>,
}

impl Config {
    /// Create a new configuration with API credentials
    ///
    /// # Arguments
    ///
    /// * `api_key` - API key from the Bybit dashboard
    /// * `secret_key` - Matching secret, used only to compute signatures
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            environment: Environment::default(),
            rest_url: None,
            private_ws_url: None,
            public_ws_url: None,
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            auth_expiry: Duration::from_millis(DEFAULT_RECV_WINDOW_MS),
            ping_interval: Some(Duration::from_secs(20)),
            topics: vec!["order".to_string()],
        }
    }

    /// Build a configuration from environment variables
    ///
    /// `BYBIT_API_KEY` and `BYBIT_SECRET_KEY` are required. Optional:
    /// `BYBIT_TESTNET` (`1`/`true`), `BYBIT_RECV_WINDOW`, `BYBIT_REST_URL`,
    /// `BYBIT_WS_PRIVATE_URL`, `BYBIT_WS_PUBLIC_URL` and `BYBIT_TOPICS`
    /// (comma separated).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{} is not set", name)))
        };

        let mut config = Config::new(required("BYBIT_API_KEY")?, required("BYBIT_SECRET_KEY")?);

        if let Some(flag) = lookup("BYBIT_TESTNET") {
            if matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes") {
                config = config.with_environment(Environment::Testnet);
            }
        }
        if let Some(window) = lookup("BYBIT_RECV_WINDOW") {
            let window = window
                .parse()
                .map_err(|_| Error::Config(format!("invalid BYBIT_RECV_WINDOW: {}", window)))?;
            config = config.with_recv_window(window);
        }
        if let Some(url) = lookup("BYBIT_REST_URL") {
            config = config.with_rest_url(url);
        }
        if let Some(url) = lookup("BYBIT_WS_PRIVATE_URL") {
            config = config.with_private_ws_url(url);
        }
        if let Some(url) = lookup("BYBIT_WS_PUBLIC_URL") {
            config = config.with_public_ws_url(url);
        }
        if let Some(topics) = lookup("BYBIT_TOPICS") {
            config = config.with_topics(
                topics
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }

        Ok(config)
    }

    /// Check that credentials are present and URLs parse
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_key.is_empty() {
            return Err(Error::Config("API key is empty".into()));
        }
        if self.secret_key.is_empty() {
            return Err(Error::Config("secret key is empty".into()));
        }
        for url in [
            self.rest_base_url(),
            self.private_ws_url(),
            self.public_ws_url(),
        ] {
            Url::parse(url).map_err(|e| Error::Config(format!("invalid URL {}: {}", url, e)))?;
        }
        Ok(())
    }

    /// Set the API environment (mainnet or testnet)
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Override the REST base URL
    #[must_use]
    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = Some(url.into());
        self
    }

    /// Override the private WebSocket URL
    #[must_use]
    pub fn with_private_ws_url(mut self, url: impl Into<String>) -> Self {
        self.private_ws_url = Some(url.into());
        self
    }

    /// Override the public WebSocket URL
    #[must_use]
    pub fn with_public_ws_url(mut self, url: impl Into<String>) -> Self {
        self.public_ws_url = Some(url.into());
        self
    }

    /// Set the receive window in milliseconds
    #[must_use]
    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    /// Set the HTTP request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the WebSocket connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how far in the future the WebSocket auth frame expires
    #[must_use]
    pub fn with_auth_expiry(mut self, expiry: Duration) -> Self {
        self.auth_expiry = expiry;
        self
    }

    /// Set the application-level ping interval (`None` disables pings)
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Option<Duration>) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the private topics subscribed on connect
    #[must_use]
    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the secret key
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Get the environment
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Get the REST API base URL
    pub fn rest_base_url(&self) -> &str {
        self.rest_url
            .as_deref()
            .unwrap_or_else(|| self.environment.rest_base_url())
    }

    /// Get the private WebSocket URL
    pub fn private_ws_url(&self) -> &str {
        self.private_ws_url
            .as_deref()
            .unwrap_or_else(|| self.environment.private_ws_url())
    }

    /// Get the public WebSocket URL
    pub fn public_ws_url(&self) -> &str {
        self.public_ws_url
            .as_deref()
            .unwrap_or_else(|| self.environment.public_ws_url())
    }

    /// Get the receive window in milliseconds
    pub fn recv_window_ms(&self) -> u64 {
        self.recv_window_ms
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the WebSocket connect timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Get the auth frame expiry offset
    pub fn auth_expiry(&self) -> Duration {
        self.auth_expiry
    }

    /// Get the ping interval
    pub fn ping_interval(&self) -> Option<Duration> {
        self.ping_interval
    }

    /// Get the private topics
    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key)
            .field("secret_key", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("rest_url", &self.rest_base_url())
            .field("private_ws_url", &self.private_ws_url())
            .field("recv_window_ms", &self.recv_window_ms)
            .field("topics", &self.topics)
            .finish_non_exhaustive()
    }
}
