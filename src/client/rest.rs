//! HTTP REST client for the Bybit v5 API.
//!
//! This module provides the [`RestClient`] for making signed HTTP requests
//! to the Bybit REST endpoints. Every call is sent exactly once; failures
//! are returned to the caller, never retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use bybit_trading::{BybitClient, Config};
//! use bybit_trading::types::{OrderRequest, Side};
//!
//! # async fn example() -> bybit_trading::Result<()> {
//! let config = Config::new("api-key", "secret");
//! let client = BybitClient::new(config)?;
//!
//! let order = OrderRequest::limit("MATICUSDC", Side::Buy, "1.0", "0.7");
//! let response = client.rest().create_order(&order).await?;
//! println!("{} in {:?}", response.result.order_id, response.latency);
//! # Ok(())
//! # }
//! ```

use std::time::Instant;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::auth::Signer;
use crate::config::Config;
use crate::error::{ApiError, Error};
use crate::types::account::{WalletBalanceQuery, WalletBalanceResult};
use crate::types::order::{CancelAllRequest, CancelAllResult, CreateOrderResult, OrderRequest};
use crate::types::response::{Envelope, RestResponse};

/// Path of the order creation endpoint
pub const CREATE_ORDER_PATH: &str = "/v5/order/create";
/// Path of the cancel-all endpoint
pub const CANCEL_ALL_PATH: &str = "/v5/order/cancel-all";
/// Path of the wallet balance endpoint
pub const WALLET_BALANCE_PATH: &str = "/v5/account/wallet-balance";

/// HTTP client for the Bybit REST API
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    signer: Signer,
}

impl RestClient {
    /// Create a new REST client
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration with credentials
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are unusable or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let signer = Signer::new(
            config.api_key(),
            config.secret_key(),
            config.recv_window_ms(),
        )?;

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.rest_base_url().trim_end_matches('/').to_string(),
            signer,
        })
    }

    /// Place an order
    ///
    /// The body is serialized once; the same bytes are signed and sent.
    pub async fn create_order(
        &self,
        order: &OrderRequest,
    ) -> Result<RestResponse<CreateOrderResult>, Error> {
        self.post(CREATE_ORDER_PATH, order).await
    }

    /// Cancel all open orders in a category (optionally for one symbol)
    pub async fn cancel_all_orders(
        &self,
        request: &CancelAllRequest,
    ) -> Result<RestResponse<CancelAllResult>, Error> {
        self.post(CANCEL_ALL_PATH, request).await
    }

    /// Get wallet balances
    pub async fn get_wallet_balance(
        &self,
        query: &WalletBalanceQuery,
    ) -> Result<RestResponse<WalletBalanceResult>, Error> {
        self.get(WALLET_BALANCE_PATH, &query.to_query_string())
            .await
    }

    /// Make a signed POST request
    ///
    /// # Arguments
    ///
    /// * `path` - API path (without base URL)
    /// * `body` - Request body to serialize as JSON
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<RestResponse<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let payload = serde_json::to_string(body)?;
        self.execute(Method::POST, path, payload, Signer::current_timestamp_ms())
            .await
    }

    /// Make a signed GET request
    ///
    /// # Arguments
    ///
    /// * `path` - API path (without base URL)
    /// * `query` - Query string without the leading `?`; signed verbatim
    pub async fn get<T>(&self, path: &str, query: &str) -> Result<RestResponse<T>, Error>
    where
        T: DeserializeOwned,
    {
        self.execute(
            Method::GET,
            path,
            query.to_string(),
            Signer::current_timestamp_ms(),
        )
        .await
    }

    /// Sign and send one request at the given timestamp
    ///
    /// For POST the payload is the body; for GET it is the query string.
    async fn execute<T>(
        &self,
        method: Method,
        path: &str,
        payload: String,
        timestamp_ms: u64,
    ) -> Result<RestResponse<T>, Error>
    where
        T: DeserializeOwned,
    {
        let headers = self
            .signer
            .auth_headers(timestamp_ms, &payload)
            .to_header_map()?;

        let request = if method == Method::GET {
            let url = if payload.is_empty() {
                format!("{}{}", self.base_url, path)
            } else {
                format!("{}{}?{}", self.base_url, path, payload)
            };
            self.client.get(url).headers(headers)
        } else {
            let url = format!("{}{}", self.base_url, path);
            self.client.request(method.clone(), url).headers(headers).body(payload)
        };

        let started = Instant::now();
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = response.text().await.map_err(transport_error)?;
        let latency = started.elapsed();

        tracing::debug!(
            %method,
            path,
            status,
            latency_ms = latency.as_millis() as u64,
            "bybit REST response"
        );

        handle_response(status, &response_headers, body, latency)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the signer
    pub fn signer(&self) -> &Signer {
        &self.signer
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Http(err)
    }
}

/// Turn a raw response into a structured result or an error
///
/// A 2xx status is not enough: the exchange reports most rejections with
/// HTTP 200 and a non-zero `retCode`.
fn handle_response<T>(
    status: u16,
    headers: &HeaderMap,
    body: String,
    latency: std::time::Duration,
) -> Result<RestResponse<T>, Error>
where
    T: DeserializeOwned,
{
    // Check for rate limiting
    if status == 429 {
        let retry_after_ms = headers
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));

        return Err(Error::RateLimited { retry_after_ms });
    }

    let envelope = serde_json::from_str::<Envelope<serde_json::Value>>(&body);

    if !(200..300).contains(&status) {
        let error = match envelope {
            Ok(envelope) => ApiError::with_code(status, envelope.ret_code, envelope.ret_msg),
            Err(_) => ApiError::new(status, body),
        };
        return Err(Error::Api(error));
    }

    let envelope = envelope?;
    if envelope.ret_code != 0 {
        tracing::warn!(
            ret_code = envelope.ret_code,
            ret_msg = %envelope.ret_msg,
            "bybit rejected request"
        );
        return Err(Error::Api(ApiError::with_code(
            status,
            envelope.ret_code,
            envelope.ret_msg,
        )));
    }

    let result = serde_json::from_value(envelope.result.unwrap_or(serde_json::Value::Null))?;

    Ok(RestResponse {
        status,
        latency,
        body,
        ret_msg: envelope.ret_msg,
        time: envelope.time,
        result,
    })
}
