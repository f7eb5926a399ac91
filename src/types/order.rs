//! Order-related types.
//!
//! This module contains the request bodies for placing and cancelling
//! orders, and the order updates pushed on the private `order` topic.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Spot trading
    #[default]
    Spot,
    /// USDT/USDC perpetuals and futures
    Linear,
    /// Inverse contracts
    Inverse,
    /// Options
    Option,
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy the base asset
    Buy,
    /// Sell the base asset
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderType {
    /// Limit order - specify price and quantity
    #[default]
    Limit,
    /// Market order - execute at best available price
    Market,
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till cancelled
    #[serde(rename = "GTC")]
    GoodTillCancel,
    /// Immediate or cancel
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    /// Fill or kill
    #[serde(rename = "FOK")]
    FillOrKill,
    /// Cancel if it would take liquidity
    PostOnly,
}

/// Request body for `POST /v5/order/create`
///
/// Field order is the wire order; the serialized body is also the signed
/// payload, so it must not be re-serialized between signing and sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Product category
    pub category: Category,

    /// Symbol, e.g. `MATICUSDC`
    pub symbol: String,

    /// Buy or sell
    pub side: Side,

    /// Limit or market
    pub order_type: OrderType,

    /// Quantity as a decimal string
    pub qty: String,

    /// Limit price as a decimal string (omitted for market orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    /// Time in force (exchange default when omitted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,

    /// Client-generated order ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_link_id: Option<String>,
}

impl OrderRequest {
    /// Create a spot limit order with a fresh client order ID
    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        qty: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            category: Category::Spot,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            qty: qty.into(),
            price: Some(price.into()),
            time_in_force: None,
            order_link_id: Some(new_order_link_id()),
        }
    }

    /// Create a spot market order with a fresh client order ID
    pub fn market(symbol: impl Into<String>, side: Side, qty: impl Into<String>) -> Self {
        Self {
            category: Category::Spot,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            qty: qty.into(),
            price: None,
            time_in_force: None,
            order_link_id: Some(new_order_link_id()),
        }
    }

    /// Set the product category
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the time in force
    #[must_use]
    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = Some(time_in_force);
        self
    }

    /// Set the client order ID (`None` lets the exchange omit it)
    #[must_use]
    pub fn with_order_link_id(mut self, id: Option<String>) -> Self {
        self.order_link_id = id;
        self
    }
}

/// Generate a random 128-bit client order ID as 32 hex characters
pub fn new_order_link_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `result` of a successful order creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResult {
    /// Exchange-assigned order ID
    pub order_id: String,
    /// Client order ID echoed back
    #[serde(default)]
    pub order_link_id: String,
}

/// Request body for `POST /v5/order/cancel-all`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAllRequest {
    /// Product category
    pub category: Category,
    /// Restrict to one symbol
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl CancelAllRequest {
    /// Cancel every open order in a category
    pub fn new(category: Category) -> Self {
        Self {
            category,
            symbol: None,
        }
    }

    /// Restrict the cancellation to one symbol
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

/// `result` of a cancel-all request
#[derive(Debug, Clone, Deserialize)]
pub struct CancelAllResult {
    /// Cancelled orders
    #[serde(default)]
    pub list: Vec<CancelledOrder>,
}

/// One cancelled order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledOrder {
    /// Exchange-assigned order ID
    pub order_id: String,
    /// Client order ID
    #[serde(default)]
    pub order_link_id: String,
}

/// Order update pushed on the private `order` topic
///
/// Numeric values stay as strings, matching the feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    /// Product category
    pub category: Category,
    /// Symbol
    pub symbol: String,
    /// Exchange-assigned order ID
    pub order_id: String,
    /// Client order ID
    #[serde(default)]
    pub order_link_id: String,
    /// Buy or sell
    pub side: Side,
    /// Limit or market
    pub order_type: OrderType,
    /// Status, e.g. `New`, `PartiallyFilled`, `Filled`, `Cancelled`
    pub order_status: String,
    /// Order price
    #[serde(default)]
    pub price: String,
    /// Order quantity
    #[serde(default)]
    pub qty: String,
    /// Average fill price
    #[serde(default)]
    pub avg_price: String,
    /// Remaining quantity
    #[serde(default)]
    pub leaves_qty: String,
    /// Filled quantity
    #[serde(default)]
    pub cum_exec_qty: String,
    /// Reject reason (`EC_NoError` when none)
    #[serde(default)]
    pub reject_reason: String,
    /// Creation time (ms, as string)
    #[serde(default)]
    pub created_time: String,
    /// Last update time (ms, as string)
    #[serde(default)]
    pub updated_time: String,
}
