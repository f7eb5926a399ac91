//! Error types for the bybit-trading crate.
//!
//! This module defines the error types that can occur when talking to
//! Bybit, including transport failures, rejected requests and stream errors.
//! Every variant maps onto an [`ErrorKind`] so callers can branch on the
//! broad category without matching individual variants.

use std::fmt;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed (DNS, TCP, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration (missing credentials, bad URL, bad header value)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exchange rejected the request
    #[error("API error {0}")]
    Api(ApiError),

    /// Rate limit exceeded
    #[error("Rate limited{}", retry_suffix(.retry_after_ms))]
    RateLimited {
        /// Retry after this many milliseconds
        retry_after_ms: Option<u64>,
    },

    /// WebSocket connection closed
    #[error("WebSocket connection closed")]
    ConnectionClosed,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
}

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network-level failure; the request may never have reached the exchange
    Transport,
    /// The exchange answered and refused the request
    RemoteRejected,
    /// Credentials or settings are unusable; fatal for the caller
    Configuration,
    /// A payload could not be encoded or decoded
    Decode,
    /// The WebSocket connection failed or closed
    Stream,
}

/// Error returned by the Bybit API
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// `retCode` from the response envelope (if present)
    pub code: Option<i64>,
    /// `retMsg` or raw body
    pub message: String,
}

fn retry_suffix(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(", retry after {}ms", ms),
        None => String::new(),
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(e) if e.is_decode() => ErrorKind::Decode,
            Error::Http(_) | Error::Timeout => ErrorKind::Transport,
            // socket, DNS, TLS and handshake failures
            Error::WebSocket(
                WsError::Io(_) | WsError::Tls(_) | WsError::Url(_) | WsError::Http(_),
            ) => ErrorKind::Transport,
            Error::WebSocket(_) | Error::ConnectionClosed => ErrorKind::Stream,
            Error::Json(_) => ErrorKind::Decode,
            Error::Config(_) => ErrorKind::Configuration,
            Error::Api(_) | Error::RateLimited { .. } => ErrorKind::RemoteRejected,
        }
    }
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Create an API error with an exchange error code
    pub fn with_code(status: u16, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code),
            message: message.into(),
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "({}, retCode {}): {}", self.status, code, self.message),
            None => write!(f, "({}): {}", self.status, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::Api(ApiError::new(400, "Bad request"));
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Bad request"));
    }

    #[test]
    fn test_api_error_with_code() {
        let err = ApiError::with_code(200, 10004, "error sign!");
        assert_eq!(err.code, Some(10004));
        assert!(!err.is_client_error());
        assert!(!err.is_server_error());
        assert_eq!(
            Error::Api(err).to_string(),
            "API error (200, retCode 10004): error sign!"
        );
    }

    #[test]
    fn test_rate_limited_display() {
        let err = Error::RateLimited {
            retry_after_ms: Some(1000),
        };
        assert!(err.to_string().contains("1000"));

        let err = Error::RateLimited {
            retry_after_ms: None,
        };
        assert_eq!(err.to_string(), "Rate limited");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::Api(ApiError::new(500, "oops")).kind(),
            ErrorKind::RemoteRejected
        );
        assert_eq!(Error::Config("no key".into()).kind(), ErrorKind::Configuration);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Transport);
        assert_eq!(Error::ConnectionClosed.kind(), ErrorKind::Stream);

        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(Error::from(json_err).kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_websocket_error_kinds() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            Error::WebSocket(WsError::Io(refused)).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            Error::WebSocket(WsError::ConnectionClosed).kind(),
            ErrorKind::Stream
        );
        assert_eq!(
            Error::WebSocket(WsError::AlreadyClosed).kind(),
            ErrorKind::Stream
        );
    }
}
