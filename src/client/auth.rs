//! HMAC-SHA256 authentication for Bybit API requests.
//!
//! Bybit v5 signs every private request with HMAC-SHA256 keyed by the API
//! secret. Each REST request must include:
//!
//! - `X-BAPI-API-KEY`: Your API key
//! - `X-BAPI-TIMESTAMP`: Unix timestamp in milliseconds
//! - `X-BAPI-RECV-WINDOW`: Tolerated clock skew in milliseconds
//! - `X-BAPI-SIGN`: hex HMAC of `timestamp + api_key + recv_window + payload`
//! - `X-BAPI-SIGN-TYPE`: `2` (HMAC-SHA256)
//!
//! The private WebSocket authenticates with an `auth` frame whose signature
//! covers `"GET/realtime" + expires`.
//!
//! # Example
//!
//! ```rust
//! use bybit_trading::client::auth::Signer;
//!
//! let signer = Signer::new("api-key", "secret", 5000).unwrap();
//! let timestamp = Signer::current_timestamp_ms();
//! let headers = signer.auth_headers(timestamp, r#"{"category":"spot"}"#);
//! assert_eq!(headers.signature.len(), 64);
//! ```

use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use sha2::Sha256;

use crate::error::Error;

type HmacSha256 = Hmac<Sha256>;

/// Compute the lowercase hex HMAC-SHA256 of `message` keyed by `secret`
pub fn sign(secret: &[u8], message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// HMAC-SHA256 signer for Bybit API authentication
#[derive(Clone)]
pub struct Signer {
    api_key: String,
    secret: Vec<u8>,
    recv_window_ms: u64,
}

impl Signer {
    /// Create a new signer
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the key or secret is empty, or if the
    /// key cannot be carried in an HTTP header.
    pub fn new(api_key: &str, secret: &str, recv_window_ms: u64) -> Result<Self, Error> {
        if api_key.is_empty() || secret.is_empty() {
            return Err(Error::Config("API key and secret must not be empty".into()));
        }
        HeaderValue::from_str(api_key)
            .map_err(|_| Error::Config("API key is not a valid header value".into()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            secret: secret.as_bytes().to_vec(),
            recv_window_ms,
        })
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the receive window in milliseconds
    pub fn recv_window_ms(&self) -> u64 {
        self.recv_window_ms
    }

    /// Build the string signed for a REST request
    ///
    /// `payload` is the exact JSON body for POST or the exact query string
    /// (without `?`) for GET.
    pub fn rest_message(&self, timestamp_ms: u64, payload: &str) -> String {
        format!(
            "{}{}{}{}",
            timestamp_ms, self.api_key, self.recv_window_ms, payload
        )
    }

    /// Build the string signed for the WebSocket `auth` frame
    pub fn ws_auth_message(expires_ms: u64) -> String {
        format!("GET/realtime{}", expires_ms)
    }

    /// Sign a REST request
    pub fn sign_rest(&self, timestamp_ms: u64, payload: &str) -> String {
        sign(&self.secret, &self.rest_message(timestamp_ms, payload))
    }

    /// Sign the WebSocket auth message for the given expiry
    pub fn sign_ws_auth(&self, expires_ms: u64) -> String {
        sign(&self.secret, &Self::ws_auth_message(expires_ms))
    }

    /// Build the authentication headers for a REST request
    pub fn auth_headers(&self, timestamp_ms: u64, payload: &str) -> AuthHeaders {
        AuthHeaders {
            key: self.api_key.clone(),
            timestamp: timestamp_ms.to_string(),
            recv_window: self.recv_window_ms.to_string(),
            signature: self.sign_rest(timestamp_ms, payload),
        }
    }

    /// Get the current timestamp in milliseconds
    pub fn current_timestamp_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("api_key", &self.api_key)
            .field("secret", &"[REDACTED]")
            .field("recv_window_ms", &self.recv_window_ms)
            .finish()
    }
}

/// Authentication headers for a Bybit REST request
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    /// API key
    pub key: String,
    /// Unix timestamp in milliseconds
    pub timestamp: String,
    /// Receive window in milliseconds
    pub recv_window: String,
    /// HMAC-SHA256 signature (hex)
    pub signature: String,
}

impl AuthHeaders {
    /// Header name for API key
    pub const KEY_HEADER: &'static str = "X-BAPI-API-KEY";
    /// Header name for signature
    pub const SIGNATURE_HEADER: &'static str = "X-BAPI-SIGN";
    /// Header name for signature type
    pub const SIGN_TYPE_HEADER: &'static str = "X-BAPI-SIGN-TYPE";
    /// Header name for timestamp
    pub const TIMESTAMP_HEADER: &'static str = "X-BAPI-TIMESTAMP";
    /// Header name for receive window
    pub const RECV_WINDOW_HEADER: &'static str = "X-BAPI-RECV-WINDOW";
    /// Signature type for HMAC-SHA256
    pub const SIGN_TYPE_HMAC: &'static str = "2";

    /// Convert into a header map, including `Content-Type: application/json`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is not a valid header value.
    pub fn to_header_map(&self) -> Result<HeaderMap, Error> {
        let value = |v: &str| {
            HeaderValue::from_str(v)
                .map_err(|_| Error::Config(format!("invalid header value: {:?}", v)))
        };

        let mut headers = HeaderMap::new();
        headers.insert(Self::KEY_HEADER, value(&self.key)?);
        headers.insert(Self::SIGNATURE_HEADER, value(&self.signature)?);
        headers.insert(
            Self::SIGN_TYPE_HEADER,
            HeaderValue::from_static(Self::SIGN_TYPE_HMAC),
        );
        headers.insert(Self::TIMESTAMP_HEADER, value(&self.timestamp)?);
        headers.insert(Self::RECV_WINDOW_HEADER, value(&self.recv_window)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}
