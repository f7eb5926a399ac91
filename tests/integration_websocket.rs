//! Integration tests for the WebSocket API.
//!
//! Each test starts an in-process WebSocket server that records the frames
//! the client sends and scripts the server side of the conversation.
//!
//! # Running
//!
//! ```bash
//! cargo test --test integration_websocket
//! ```

use std::time::Duration;

use bybit_trading::client::auth::sign;
use bybit_trading::client::websocket::{
    ConnectionState, ReconnectConfig, ReconnectingStream, WebSocketClient,
};
use bybit_trading::types::WsMessage;
use bybit_trading::{Config, Error};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

type ServerWs = WebSocketStream<TcpStream>;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind a mock server on a free port and return it with its URL
async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

/// Read `n` text frames sent by the client
async fn read_frames(ws: &mut ServerWs, n: usize) -> Vec<Value> {
    let mut frames = Vec::new();
    while frames.len() < n {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => frames.push(serde_json::from_str(&text).unwrap()),
            Some(Ok(_)) => continue,
            other => panic!("client stopped sending: {:?}", other),
        }
    }
    frames
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

fn test_config(url: &str) -> Config {
    Config::new("test-key", "test-secret")
        .with_private_ws_url(url)
        .with_public_ws_url(url)
        .with_ping_interval(None)
}

fn order_message(order_id: &str) -> Value {
    json!({
        "id": format!("msg-{}", order_id),
        "topic": "order",
        "creationTime": 1700000000000u64,
        "data": [{
            "category": "spot",
            "symbol": "MATICUSDC",
            "orderId": order_id,
            "orderLinkId": "",
            "side": "Buy",
            "orderType": "Limit",
            "orderStatus": "New",
            "price": "0.7",
            "qty": "1.0"
        }]
    })
}

#[tokio::test]
async fn test_auth_precedes_subscribe_then_close() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let frames = read_frames(&mut ws, 2).await;
        ws.close(None).await.unwrap();
        frames
    });

    let mut client = WebSocketClient::connect(&test_config(&url)).await.unwrap();
    assert_eq!(client.state(), ConnectionState::Subscribed);

    // Peer closes right after subscribe: the stream ends without an error
    let next = timeout(TEST_TIMEOUT, client.next()).await.unwrap();
    assert!(next.is_none(), "expected end of stream, got {:?}", next);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.next().await.is_none());

    let frames = server.await.unwrap();
    assert_eq!(frames[0]["op"], "auth");
    assert_eq!(frames[1]["op"], "subscribe");
    assert_eq!(frames[1]["args"], json!(["order"]));

    let args = frames[0]["args"].as_array().unwrap();
    assert_eq!(args[0], "test-key");
    let expires = args[1].as_u64().expect("expires is a number");
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;
    assert!(expires > now, "auth frame must expire in the future");
    assert_eq!(
        args[2],
        sign(b"test-secret", &format!("GET/realtime{}", expires))
    );
}

#[tokio::test]
async fn test_frames_dispatched_in_arrival_order() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        read_frames(&mut ws, 2).await;
        send_json(
            &mut ws,
            json!({"success": true, "ret_msg": "", "op": "auth", "conn_id": "c1"}),
        )
        .await;
        send_json(
            &mut ws,
            json!({"success": true, "ret_msg": "", "op": "subscribe", "conn_id": "c1"}),
        )
        .await;
        for id in ["1", "2", "3"] {
            send_json(&mut ws, order_message(id)).await;
        }
        ws.close(None).await.unwrap();
    });

    let mut client = WebSocketClient::connect(&test_config(&url)).await.unwrap();
    let mut seen = Vec::new();
    timeout(TEST_TIMEOUT, client.run(|msg| seen.push(msg)))
        .await
        .expect("run should finish when the server closes");

    assert_eq!(seen.len(), 5);
    let mut ops = Vec::new();
    let mut order_ids = Vec::new();
    for msg in seen {
        match msg.unwrap() {
            WsMessage::Op(ack) => {
                assert!(ack.is_success());
                ops.push(ack.op);
            }
            WsMessage::Topic(topic) => {
                let updates = topic.order_updates().unwrap().unwrap();
                order_ids.push(updates[0].order_id.clone());
            }
        }
    }
    assert_eq!(ops, ["auth", "subscribe"]);
    assert_eq!(order_ids, ["1", "2", "3"]);
    assert_eq!(client.state(), ConnectionState::Disconnected);

    server.await.unwrap();
}

#[tokio::test]
async fn test_bad_frame_does_not_drop_connection() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        read_frames(&mut ws, 2).await;
        ws.send(Message::Text("not json".to_string())).await.unwrap();
        send_json(&mut ws, order_message("7")).await;
        ws.close(None).await.unwrap();
    });

    let mut client = WebSocketClient::connect(&test_config(&url)).await.unwrap();

    let first = timeout(TEST_TIMEOUT, client.next()).await.unwrap();
    assert!(matches!(first, Some(Err(Error::Json(_)))));
    assert_eq!(client.state(), ConnectionState::Subscribed);

    let second = timeout(TEST_TIMEOUT, client.next()).await.unwrap();
    assert!(matches!(second, Some(Ok(WsMessage::Topic(_)))));

    assert!(timeout(TEST_TIMEOUT, client.next()).await.unwrap().is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn test_subscribe_after_disconnect_fails() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        read_frames(&mut ws, 2).await;
        ws.close(None).await.unwrap();
    });

    let mut client = WebSocketClient::connect(&test_config(&url)).await.unwrap();
    assert!(timeout(TEST_TIMEOUT, client.next()).await.unwrap().is_none());

    let result = client.subscribe(&["execution".to_string()]).await;
    assert!(matches!(result, Err(Error::ConnectionClosed)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_public_stream_skips_auth() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let frames = read_frames(&mut ws, 1).await;
        ws.close(None).await.unwrap();
        frames
    });

    let topics = vec!["orderbook.1.MATICUSDT".to_string()];
    let mut client = WebSocketClient::connect_public(&test_config(&url), &topics)
        .await
        .unwrap();
    assert_eq!(client.topics(), topics.as_slice());
    assert!(timeout(TEST_TIMEOUT, client.next()).await.unwrap().is_none());

    let frames = server.await.unwrap();
    assert_eq!(frames[0]["op"], "subscribe");
    assert_eq!(frames[0]["args"], json!(["orderbook.1.MATICUSDT"]));
}

#[tokio::test]
async fn test_reconnecting_stream_resubscribes() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        // First connection drops after the extra subscribe arrives
        let mut first = accept(&listener).await;
        let first_frames = read_frames(&mut first, 3).await;
        first.close(None).await.unwrap();

        // Second connection must authenticate and subscribe again
        let mut second = accept(&listener).await;
        let second_frames = read_frames(&mut second, 2).await;
        send_json(&mut second, order_message("42")).await;
        // keep the socket open until the client closes it
        while let Some(Ok(_)) = second.next().await {}
        (first_frames, second_frames)
    });

    let config = test_config(&url);
    let reconnect = ReconnectConfig::new()
        .max_retries(3)
        .initial_delay_ms(10)
        .max_delay_ms(50);
    let mut stream = ReconnectingStream::connect(config, reconnect).await.unwrap();
    stream.subscribe(&["execution".to_string()]).await.unwrap();

    let msg = timeout(TEST_TIMEOUT, stream.next()).await.unwrap();
    match msg {
        Some(Ok(WsMessage::Topic(topic))) => assert_eq!(topic.topic, "order"),
        other => panic!("expected order update after reconnect, got {:?}", other),
    }
    assert!(stream.is_connected());
    assert_eq!(stream.reconnect_attempt(), 0);
    assert_eq!(stream.disconnects(), 1);

    stream.close().await.unwrap();
    assert!(stream.next().await.is_none());

    let (first_frames, second_frames) = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
    assert_eq!(first_frames[0]["op"], "auth");
    assert_eq!(first_frames[1]["op"], "subscribe");
    assert_eq!(first_frames[2]["args"], json!(["execution"]));
    assert_eq!(second_frames[0]["op"], "auth");
    assert_eq!(second_frames[1]["op"], "subscribe");
    assert_eq!(second_frames[1]["args"], json!(["order", "execution"]));
}

#[tokio::test]
async fn test_reconnecting_stream_surfaces_transport_error() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        // Drop the socket without a close handshake
        let mut first = accept(&listener).await;
        read_frames(&mut first, 2).await;
        drop(first);

        let mut second = accept(&listener).await;
        read_frames(&mut second, 2).await;
        send_json(&mut second, order_message("43")).await;
        while let Some(Ok(_)) = second.next().await {}
    });

    let reconnect = ReconnectConfig::new()
        .max_retries(3)
        .initial_delay_ms(10)
        .max_delay_ms(50);
    let mut stream = ReconnectingStream::connect(test_config(&url), reconnect)
        .await
        .unwrap();

    // The broken connection is reported before the stream resumes
    let first = timeout(TEST_TIMEOUT, stream.next()).await.unwrap();
    assert!(
        matches!(first, Some(Err(Error::WebSocket(_)))),
        "expected transport error, got {:?}",
        first
    );
    assert!(!stream.is_connected());
    assert_eq!(stream.disconnects(), 1);

    let second = timeout(TEST_TIMEOUT, stream.next()).await.unwrap();
    assert!(matches!(second, Some(Ok(WsMessage::Topic(_)))));
    assert!(stream.is_connected());

    stream.close().await.unwrap();
    timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_reconnecting_stream_gives_up() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        read_frames(&mut ws, 2).await;
        ws.close(None).await.unwrap();
        // stop accepting so every reconnect fails
        drop(listener);
    });

    let reconnect = ReconnectConfig::new()
        .max_retries(2)
        .initial_delay_ms(10)
        .max_delay_ms(20);
    let config = test_config(&url).with_connect_timeout(Duration::from_secs(1));
    let mut stream = ReconnectingStream::connect(config, reconnect).await.unwrap();

    let msg = timeout(TEST_TIMEOUT, stream.next()).await.unwrap();
    assert!(matches!(msg, Some(Err(Error::ConnectionClosed))));
    assert!(stream.next().await.is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn test_control_ping_answered_with_pong() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        read_frames(&mut ws, 2).await;
        ws.send(Message::Ping(b"hb".to_vec())).await.unwrap();
        let pong = loop {
            match ws.next().await {
                Some(Ok(Message::Pong(payload))) => break payload,
                Some(Ok(_)) => continue,
                other => panic!("no pong before {:?}", other),
            }
        };
        send_json(&mut ws, order_message("9")).await;
        ws.close(None).await.unwrap();
        pong
    });

    let mut client = WebSocketClient::connect(&test_config(&url)).await.unwrap();

    // The ping itself is not handed out; the next frame is the order update
    let msg = timeout(TEST_TIMEOUT, client.next()).await.unwrap();
    assert!(matches!(msg, Some(Ok(WsMessage::Topic(_)))));
    assert!(timeout(TEST_TIMEOUT, client.next()).await.unwrap().is_none());

    let pong = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
    assert_eq!(pong, b"hb".to_vec());
}

#[tokio::test]
async fn test_run_sends_app_level_ping() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let frames = read_frames(&mut ws, 3).await;
        ws.close(None).await.unwrap();
        frames
    });

    let config = test_config(&url).with_ping_interval(Some(Duration::from_millis(50)));
    let mut client = WebSocketClient::connect(&config).await.unwrap();
    let mut errors = 0;
    timeout(TEST_TIMEOUT, client.run(|msg| {
        if msg.is_err() {
            errors += 1;
        }
    }))
    .await
    .expect("run should finish when the server closes");
    assert_eq!(errors, 0);

    let frames = server.await.unwrap();
    assert_eq!(frames[0]["op"], "auth");
    assert_eq!(frames[1]["op"], "subscribe");
    assert_eq!(frames[2]["op"], "ping");
    assert!(frames[2]["req_id"].is_string());
}

#[tokio::test]
async fn test_public_stream_without_topics_waits_for_subscribe() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let frames = read_frames(&mut ws, 1).await;
        ws.close(None).await.unwrap();
        frames
    });

    let mut client = WebSocketClient::connect_public(&test_config(&url), &[])
        .await
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    // Nothing to send: still not subscribed
    client.subscribe(&[]).await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    client
        .subscribe(&["orderbook.1.MATICUSDT".to_string()])
        .await
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Subscribed);
    assert!(timeout(TEST_TIMEOUT, client.next()).await.unwrap().is_none());

    let frames = server.await.unwrap();
    assert_eq!(frames[0]["op"], "subscribe");
    assert_eq!(frames[0]["args"], json!(["orderbook.1.MATICUSDT"]));
}
