//! # bybit-trading
//!
//! A signed REST and WebSocket client for the [Bybit](https://www.bybit.com) v5 API.
//!
//! ## Features
//!
//! - **HMAC-SHA256 signing** - REST headers and WebSocket auth frames
//! - **REST API Client** - Order creation, cancel-all and wallet balance, with
//!   structured results (status, latency, body, decoded payload)
//! - **WebSocket Client** - Private stream with auth-then-subscribe, ordered
//!   frame delivery and an opt-in reconnecting supervisor
//! - **Async/Await** - Built on Tokio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bybit_trading::{BybitClient, Config};
//! use bybit_trading::types::{OrderRequest, Side};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bybit_trading::Error> {
//!     let config = Config::from_env()?;
//!     let client = BybitClient::new(config)?;
//!
//!     // Buy 1.0 MATIC at 0.7 USDC
//!     let order = OrderRequest::limit("MATICUSDC", Side::Buy, "1.0", "0.7");
//!     let response = client.rest().create_order(&order).await?;
//!     println!("order {} placed in {:?}", response.result.order_id, response.latency);
//!
//!     // Stream private order updates
//!     let mut stream = client.private_stream().await?;
//!     while let Some(msg) = stream.next().await {
//!         println!("{:?}", msg);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - REST and WebSocket clients plus the request signer
//! - [`types`] - Request/response types matching the Bybit API
//! - [`config`] - Configuration and credentials management
//! - [`error`] - Error types for the crate

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::{Error, ErrorKind};

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// The main Bybit API client
///
/// Holds the configuration and a shared REST client, and opens stream
/// connections on demand.
#[derive(Debug, Clone)]
pub struct BybitClient {
    config: Config,
    rest_client: client::rest::RestClient,
}

impl BybitClient {
    /// Create a new Bybit client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are unusable or the HTTP client
    /// cannot be initialized.
    pub fn new(config: Config) -> Result<Self> {
        let rest_client = client::rest::RestClient::new(&config)?;
        Ok(Self {
            config,
            rest_client,
        })
    }

    /// Get a reference to the REST client
    pub fn rest(&self) -> &client::rest::RestClient {
        &self.rest_client
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the private stream, authenticated and subscribed to the
    /// configured topics
    pub async fn private_stream(&self) -> Result<client::websocket::WebSocketClient> {
        client::websocket::WebSocketClient::connect(&self.config).await
    }

    /// Open the private stream under a reconnecting supervisor
    pub async fn reconnecting_stream(
        &self,
        reconnect: client::websocket::ReconnectConfig,
    ) -> Result<client::websocket::ReconnectingStream> {
        client::websocket::ReconnectingStream::connect(self.config.clone(), reconnect).await
    }

    /// Open the public stream subscribed to `topics`
    pub async fn public_stream(
        &self,
        topics: &[String],
    ) -> Result<client::websocket::WebSocketClient> {
        client::websocket::WebSocketClient::connect_public(&self.config, topics).await
    }
}
