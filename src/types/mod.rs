//! API types for Bybit requests and responses.
//!
//! This module contains Rust types that correspond to the Bybit v5 API's
//! JSON request and response bodies.
//!
//! - [`order`] - Order-related types (Side, OrderRequest, OrderUpdate, etc.)
//! - [`account`] - Wallet balance types
//! - [`response`] - REST response envelope and structured result
//! - [`messages`] - WebSocket frame types

pub mod account;
pub mod messages;
pub mod order;
pub mod response;

pub use account::{WalletBalanceQuery, WalletBalanceResult};
pub use messages::{OpResponse, OrderBookUpdate, PriceLevel, TopicMessage, WsMessage, WsRequest};
pub use order::{
    CancelAllRequest, Category, CreateOrderResult, OrderRequest, OrderType, OrderUpdate, Side,
    TimeInForce,
};
pub use response::RestResponse;

