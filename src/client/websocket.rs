//! WebSocket client for Bybit's private and public streams.
//!
//! A private connection moves through three states:
//!
//! ```text
//! Disconnected -> Authenticating -> Subscribed -> Disconnected
//! ```
//!
//! A public connection skips authentication and starts out `Connected`.
//!
//! As soon as the socket is open the client sends the `auth` frame, then
//! immediately sends `subscribe` without waiting for the auth
//! acknowledgement. Inbound frames are handed out one at a time in arrival
//! order. When the peer closes the socket or the transport fails, the
//! connection becomes `Disconnected` and stays there; wrap it in a
//! [`ReconnectingStream`] to reopen it automatically.
//!
//! # Example
//!
//! ```rust,no_run
//! use bybit_trading::Config;
//! use bybit_trading::client::websocket::WebSocketClient;
//! use bybit_trading::types::WsMessage;
//!
//! # async fn example() -> bybit_trading::Result<()> {
//! let config = Config::new("api-key", "secret");
//! let mut ws = WebSocketClient::connect(&config).await?;
//!
//! while let Some(msg) = ws.next().await {
//!     match msg {
//!         Ok(WsMessage::Topic(topic)) => println!("{}: {}", topic.topic, topic.data),
//!         Ok(WsMessage::Op(ack)) => println!("{} ack: {}", ack.op, ack.is_success()),
//!         Err(e) => eprintln!("stream error: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::client::auth::Signer;
use crate::config::Config;
use crate::error::Error;
use crate::types::messages::{WsMessage, WsRequest};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle state of a stream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable socket; terminal for a [`WebSocketClient`]
    Disconnected,
    /// Socket open, nothing sent yet (public streams)
    Connected,
    /// Socket open, `auth` frame sent
    Authenticating,
    /// `subscribe` frame sent; steady state
    Subscribed,
}

/// WebSocket client for one Bybit stream connection
///
/// # Thread Safety
///
/// The client is driven through `&mut self`, so exactly one task reads from
/// it and frames are never handled concurrently. Offload slow work from the
/// message handler to keep the read loop responsive.
pub struct WebSocketClient {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    state: ConnectionState,
    topics: Vec<String>,
    ping_interval: Option<Duration>,
}

impl std::fmt::Debug for WebSocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketClient")
            .field("state", &self.state)
            .field("topics", &self.topics)
            .field("ping_interval", &self.ping_interval)
            .finish()
    }
}

impl WebSocketClient {
    /// Connect to the private stream, authenticate and subscribe to the
    /// configured topics
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are unusable, the connection
    /// cannot be opened within the connect timeout, or a frame cannot be
    /// sent.
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        Self::connect_with_topics(config, config.topics()).await
    }

    /// Connect to the private stream and subscribe to `topics` instead of
    /// the configured ones
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `topics` is empty.
    pub async fn connect_with_topics(config: &Config, topics: &[String]) -> Result<Self, Error> {
        config.validate()?;
        if topics.is_empty() {
            return Err(Error::Config("no private topics to subscribe".into()));
        }
        let signer = Signer::new(
            config.api_key(),
            config.secret_key(),
            config.recv_window_ms(),
        )?;

        let mut client = Self::open(config.private_ws_url(), config).await?;
        client.authenticate(&signer, config.auth_expiry()).await?;
        client.subscribe(topics).await?;
        Ok(client)
    }

    /// Connect to the public stream and subscribe to `topics` (no auth)
    ///
    /// Public topics look like `orderbook.1.MATICUSDT`. With no topics the
    /// connection stays `Connected` until [`subscribe`](Self::subscribe).
    pub async fn connect_public(config: &Config, topics: &[String]) -> Result<Self, Error> {
        let mut client = Self::open(config.public_ws_url(), config).await?;
        client.subscribe(topics).await?;
        Ok(client)
    }

    async fn open(url: &str, config: &Config) -> Result<Self, Error> {
        let connect = tokio_tungstenite::connect_async(url);
        let (ws_stream, _response) = tokio::time::timeout(config.connect_timeout(), connect)
            .await
            .map_err(|_| Error::Timeout)??;
        tracing::info!(url, "bybit stream connected");

        let (write, read) = ws_stream.split();
        Ok(Self {
            write,
            read,
            state: ConnectionState::Connected,
            topics: Vec::new(),
            ping_interval: config.ping_interval(),
        })
    }

    /// Send the `auth` frame, expiring `expiry` from now
    async fn authenticate(&mut self, signer: &Signer, expiry: Duration) -> Result<(), Error> {
        let expires_ms = Signer::current_timestamp_ms() + expiry.as_millis() as u64;
        let signature = signer.sign_ws_auth(expires_ms);
        self.state = ConnectionState::Authenticating;

        tracing::debug!(expires_ms, "sending auth frame");
        let frame = WsRequest::auth(Some(new_req_id()), signer.api_key(), expires_ms, &signature);
        self.send(&frame).await
    }

    /// Send a frame to the server
    async fn send(&mut self, frame: &WsRequest) -> Result<(), Error> {
        if self.state == ConnectionState::Disconnected {
            return Err(Error::ConnectionClosed);
        }
        let json = serde_json::to_string(frame)?;
        if let Err(e) = self.write.send(Message::Text(json)).await {
            self.mark_disconnected("send failed");
            return Err(e.into());
        }
        Ok(())
    }

    /// Subscribe to additional topics
    ///
    /// An empty list sends nothing and leaves the state unchanged.
    pub async fn subscribe(&mut self, topics: &[String]) -> Result<(), Error> {
        if self.state == ConnectionState::Disconnected {
            return Err(Error::ConnectionClosed);
        }
        if topics.is_empty() {
            return Ok(());
        }
        tracing::debug!(?topics, "subscribing");
        self.send(&WsRequest::subscribe(Some(new_req_id()), topics))
            .await?;
        for topic in topics {
            if !self.topics.contains(topic) {
                self.topics.push(topic.clone());
            }
        }
        self.state = ConnectionState::Subscribed;
        Ok(())
    }

    /// Unsubscribe from topics
    pub async fn unsubscribe(&mut self, topics: &[String]) -> Result<(), Error> {
        self.send(&WsRequest::unsubscribe(Some(new_req_id()), topics))
            .await?;
        self.topics.retain(|t| !topics.contains(t));
        Ok(())
    }

    /// Send an application-level `ping`
    ///
    /// Bybit drops idle connections; the server answers with a `pong` op.
    pub async fn ping(&mut self) -> Result<(), Error> {
        self.send(&WsRequest::ping(Some(new_req_id()))).await
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Topics subscribed on this connection
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Receive the next message from the WebSocket
    ///
    /// Ping/pong control frames are answered by the transport and skipped.
    /// A frame that fails to decode is returned as an error and the
    /// connection stays up.
    ///
    /// # Returns
    ///
    /// The next message, or `None` once the connection is closed. A
    /// transport error is returned once, after which the connection is
    /// `Disconnected` and `None` follows.
    pub async fn next(&mut self) -> Option<Result<WsMessage, Error>> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        loop {
            let frame = match self.read.next().await {
                Some(frame) => frame,
                None => {
                    self.mark_disconnected("stream ended");
                    return None;
                }
            };

            match frame {
                Ok(Message::Text(text)) => {
                    tracing::trace!(%text, "frame received");
                    return Some(match serde_json::from_str::<WsMessage>(&text) {
                        Ok(msg) => {
                            log_rejected_op(&msg);
                            Ok(msg)
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "undecodable frame");
                            Err(e.into())
                        }
                    });
                }
                Ok(Message::Ping(_)) => {
                    tracing::trace!("ping received");
                }
                Ok(Message::Pong(_)) => {
                    tracing::trace!("pong received");
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!(?frame, "bybit stream closed by peer");
                    self.mark_disconnected("closed by peer");
                    return None;
                }
                Ok(_) => {
                    // Ignore binary and raw frames
                    continue;
                }
                Err(e) => {
                    self.mark_disconnected("transport error");
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// Drive the connection until it closes, handing every message or error
    /// to `handler` in arrival order
    ///
    /// Between frames an application-level ping is sent every
    /// `ping_interval` (if configured).
    pub async fn run<F>(&mut self, mut handler: F)
    where
        F: FnMut(Result<WsMessage, Error>),
    {
        let mut ticker = self.ping_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            let event = match ticker.as_mut() {
                Some(ticker) => tokio::select! {
                    msg = self.next() => Event::Frame(msg),
                    _ = ticker.tick() => Event::PingDue,
                },
                None => Event::Frame(self.next().await),
            };

            match event {
                Event::Frame(Some(msg)) => handler(msg),
                Event::Frame(None) => break,
                Event::PingDue => {
                    if let Err(e) = self.ping().await {
                        handler(Err(e));
                    }
                }
            }
        }
    }

    /// Close the WebSocket connection
    pub async fn close(&mut self) -> Result<(), Error> {
        if self.state == ConnectionState::Disconnected {
            return Ok(());
        }
        self.mark_disconnected("closed by client");
        self.write.close().await?;
        Ok(())
    }

    fn mark_disconnected(&mut self, reason: &str) {
        if self.state != ConnectionState::Disconnected {
            tracing::info!(reason, "bybit stream disconnected");
            self.state = ConnectionState::Disconnected;
        }
    }
}

enum Event {
    Frame(Option<Result<WsMessage, Error>>),
    PingDue,
}

fn new_req_id() -> String {
    Uuid::new_v4().to_string()
}

fn log_rejected_op(msg: &WsMessage) {
    if let WsMessage::Op(ack) = msg {
        if !ack.is_success() {
            tracing::warn!(op = %ack.op, ret_msg = %ack.ret_msg, "bybit rejected operation");
        }
    }
}

/// Configuration for reconnection behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts (0 = infinite)
    pub max_retries: u32,
    /// Initial delay between reconnection attempts
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Create a new reconnect config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum retries (0 = infinite)
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set initial delay in milliseconds
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    /// Set maximum delay in milliseconds
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Set backoff multiplier
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate delay for a given retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

/// Private stream that reopens itself after disconnection.
///
/// On every reconnect the supervisor authenticates again and re-subscribes
/// to the configured topics plus any added through
/// [`ReconnectingStream::subscribe`].
///
/// # Example
///
/// ```rust,no_run
/// use bybit_trading::Config;
/// use bybit_trading::client::websocket::{ReconnectConfig, ReconnectingStream};
///
/// # async fn example() -> bybit_trading::Result<()> {
/// let config = Config::new("api-key", "secret");
/// let mut ws = ReconnectingStream::connect(config, ReconnectConfig::default()).await?;
///
/// while let Some(msg) = ws.next().await {
///     println!("{:?}", msg);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ReconnectingStream {
    client: Option<WebSocketClient>,
    config: Config,
    reconnect_config: ReconnectConfig,
    topics: Vec<String>,
    reconnect_attempt: u32,
    disconnects: u64,
    closed: bool,
}

impl std::fmt::Debug for ReconnectingStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectingStream")
            .field("connected", &self.client.is_some())
            .field("reconnect_attempt", &self.reconnect_attempt)
            .field("disconnects", &self.disconnects)
            .field("topics", &self.topics)
            .field("closed", &self.closed)
            .finish()
    }
}

impl ReconnectingStream {
    /// Connect to the private stream with reconnection support
    pub async fn connect(config: Config, reconnect_config: ReconnectConfig) -> Result<Self, Error> {
        let topics = config.topics().to_vec();
        let client = WebSocketClient::connect_with_topics(&config, &topics).await?;

        Ok(Self {
            client: Some(client),
            config,
            reconnect_config,
            topics,
            reconnect_attempt: 0,
            disconnects: 0,
            closed: false,
        })
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        self.client
            .as_ref()
            .is_some_and(|c| c.state() != ConnectionState::Disconnected)
    }

    /// Get the current reconnection attempt number
    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt
    }

    /// Number of times the connection dropped since [`connect`](Self::connect)
    ///
    /// Compare before and after [`next`](Self::next) to detect a gap in
    /// the stream after a peer close.
    pub fn disconnects(&self) -> u64 {
        self.disconnects
    }

    /// Topics replayed on reconnect
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Subscribe to more topics; they are replayed on reconnect
    pub async fn subscribe(&mut self, topics: &[String]) -> Result<(), Error> {
        for topic in topics {
            if !self.topics.contains(topic) {
                self.topics.push(topic.clone());
            }
        }
        match self.client.as_mut() {
            Some(client) => client.subscribe(topics).await,
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Receive the next message, reconnecting if necessary
    ///
    /// Decode errors are returned as-is. A transport error is returned once
    /// and the following call reconnects. A peer close reconnects right
    /// away and bumps [`disconnects`](Self::disconnects). `None` is
    /// returned only after [`close`](Self::close) or after giving up.
    pub async fn next(&mut self) -> Option<Result<WsMessage, Error>> {
        loop {
            if self.closed {
                return None;
            }
            if let Some(client) = self.client.as_mut() {
                match client.next().await {
                    Some(Ok(msg)) => {
                        self.reconnect_attempt = 0;
                        return Some(Ok(msg));
                    }
                    Some(Err(e)) if client.state() != ConnectionState::Disconnected => {
                        return Some(Err(e));
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "bybit stream failed, will reconnect");
                        self.client = None;
                        self.disconnects += 1;
                        return Some(Err(e));
                    }
                    None => {
                        tracing::warn!("bybit stream closed by peer, reconnecting");
                        self.client = None;
                        self.disconnects += 1;
                    }
                }
            }

            if let Err(e) = self.attempt_reconnect().await {
                self.closed = true;
                return Some(Err(e));
            }
        }
    }

    /// Attempt to reconnect with exponential backoff
    async fn attempt_reconnect(&mut self) -> Result<(), Error> {
        loop {
            if self.reconnect_config.max_retries > 0
                && self.reconnect_attempt >= self.reconnect_config.max_retries
            {
                tracing::warn!(attempts = self.reconnect_attempt, "giving up reconnecting");
                return Err(Error::ConnectionClosed);
            }

            let delay = self.reconnect_config.delay_for_attempt(self.reconnect_attempt);
            tokio::time::sleep(delay).await;
            self.reconnect_attempt += 1;

            match WebSocketClient::connect_with_topics(&self.config, &self.topics).await {
                Ok(client) => {
                    tracing::info!(attempt = self.reconnect_attempt, "bybit stream reconnected");
                    self.client = Some(client);
                    return Ok(());
                }
                Err(Error::Config(msg)) => return Err(Error::Config(msg)),
                Err(e) => {
                    tracing::warn!(attempt = self.reconnect_attempt, error = %e, "reconnect failed");
                }
            }
        }
    }

    /// Close the connection; no further reconnects are attempted
    pub async fn close(&mut self) -> Result<(), Error> {
        self.closed = true;
        if let Some(mut client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }
}
