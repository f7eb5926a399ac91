//! WebSocket message types.
//!
//! This module contains the operation frames sent to Bybit and the
//! messages received on the public and private streams.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::order::OrderUpdate;

/// Operation frame sent to the server
///
/// ```json
/// {"req_id":"...","op":"auth","args":["api-key",1700000005000,"<hex signature>"]}
/// {"req_id":"...","op":"subscribe","args":["order"]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsRequest {
    /// Request ID echoed in the acknowledgement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,
    /// Operation name
    pub op: String,
    /// Operation arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

impl WsRequest {
    /// Build an `auth` frame; `expires_ms` is sent as a JSON number
    pub fn auth(
        req_id: Option<String>,
        api_key: &str,
        expires_ms: u64,
        signature: &str,
    ) -> Self {
        Self {
            req_id,
            op: "auth".to_string(),
            args: vec![
                Value::from(api_key),
                Value::from(expires_ms),
                Value::from(signature),
            ],
        }
    }

    /// Build a `subscribe` frame
    pub fn subscribe(req_id: Option<String>, topics: &[String]) -> Self {
        Self {
            req_id,
            op: "subscribe".to_string(),
            args: topics.iter().map(|t| Value::from(t.as_str())).collect(),
        }
    }

    /// Build an `unsubscribe` frame
    pub fn unsubscribe(req_id: Option<String>, topics: &[String]) -> Self {
        Self {
            op: "unsubscribe".to_string(),
            ..Self::subscribe(req_id, topics)
        }
    }

    /// Build an application-level `ping` frame
    pub fn ping(req_id: Option<String>) -> Self {
        Self {
            req_id,
            op: "ping".to_string(),
            args: Vec::new(),
        }
    }
}

/// Message received from the server
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WsMessage {
    /// Data pushed for a subscribed topic
    Topic(TopicMessage),
    /// Acknowledgement of an operation (auth, subscribe, ping)
    Op(OpResponse),
}

/// Acknowledgement of an operation
///
/// Private-stream pongs arrive as `{"op":"pong","args":["<ts>"],...}`
/// without a `success` field.
#[derive(Debug, Clone, Deserialize)]
pub struct OpResponse {
    /// Operation being acknowledged
    pub op: String,
    /// Whether the operation succeeded
    pub success: Option<bool>,
    /// Reason, empty on success
    #[serde(default)]
    pub ret_msg: String,
    /// Connection ID assigned by the server
    pub conn_id: Option<String>,
    /// Request ID from the operation frame
    pub req_id: Option<String>,
}

impl OpResponse {
    /// `true` unless the server explicitly reported failure
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(true)
    }
}

/// Data pushed for a topic
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMessage {
    /// Topic name, e.g. `order` or `orderbook.1.MATICUSDT`
    pub topic: String,
    /// Message ID
    pub id: Option<String>,
    /// `snapshot` or `delta` on public topics
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Creation time (private topics)
    pub creation_time: Option<u64>,
    /// Timestamp (public topics)
    pub ts: Option<u64>,
    /// Topic payload
    pub data: Value,
}

impl TopicMessage {
    /// Decode the payload of an `order` / `order.<category>` topic
    ///
    /// Returns `None` for other topics.
    pub fn order_updates(&self) -> Option<Result<Vec<OrderUpdate>, serde_json::Error>> {
        if self.topic == "order" || self.topic.starts_with("order.") {
            Some(Vec::<OrderUpdate>::deserialize(&self.data))
        } else {
            None
        }
    }

    /// Decode the payload of an `orderbook.<depth>.<symbol>` topic
    ///
    /// Returns `None` for other topics. Whether the update is a snapshot or
    /// a delta is in [`kind`](Self::kind).
    pub fn order_book(&self) -> Option<Result<OrderBookUpdate, serde_json::Error>> {
        if self.topic.starts_with("orderbook.") {
            Some(OrderBookUpdate::deserialize(&self.data))
        } else {
            None
        }
    }
}

/// Price level as `(price, size)` decimal strings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriceLevel(pub String, pub String);

impl PriceLevel {
    /// Price
    pub fn price(&self) -> &str {
        &self.0
    }

    /// Size at this price; `"0"` in a delta removes the level
    pub fn size(&self) -> &str {
        &self.1
    }
}

/// Order book snapshot or delta from a public `orderbook` topic
#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookUpdate {
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// Bid levels, best first
    #[serde(rename = "b", default)]
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best first
    #[serde(rename = "a", default)]
    pub asks: Vec<PriceLevel>,
    /// Update ID
    #[serde(rename = "u")]
    pub update_id: Option<u64>,
    /// Cross sequence
    pub seq: Option<u64>,
}
