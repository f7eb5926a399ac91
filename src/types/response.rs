//! REST response envelope.

use std::time::Duration;

use serde::Deserialize;

/// Envelope every v5 REST response is wrapped in
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// `0` on success
    pub ret_code: i64,
    /// `OK` on success, otherwise the rejection reason
    #[serde(default)]
    pub ret_msg: String,
    /// Endpoint-specific payload
    pub result: Option<T>,
    /// Server time in milliseconds
    pub time: Option<u64>,
}

/// Structured result of a successful REST call
#[derive(Debug, Clone)]
pub struct RestResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Time from send to full body received
    pub latency: Duration,
    /// Raw response body
    pub body: String,
    /// `retMsg` from the envelope
    pub ret_msg: String,
    /// Server time in milliseconds
    pub time: Option<u64>,
    /// Decoded `result`
    pub result: T,
}
