//! API clients for communicating with Bybit.
//!
//! This module contains:
//!
//! - [`rest`] - HTTP client for signed REST endpoints
//! - [`websocket`] - WebSocket client for the private and public streams
//! - [`auth`] - HMAC-SHA256 signing utilities

pub mod auth;
pub mod rest;
pub mod websocket;

pub use auth::Signer;
pub use rest::RestClient;
pub use websocket::{ConnectionState, ReconnectConfig, ReconnectingStream, WebSocketClient};
