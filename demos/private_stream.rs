//! Stream private order updates
//!
//! Usage:
//!   BYBIT_API_KEY=xxx BYBIT_SECRET_KEY=yyy cargo run --example private_stream
//!
//! Optional:
//!   BYBIT_TESTNET=1               # Use testnet (default: mainnet)
//!   BYBIT_TOPICS=order,execution  # Topics to subscribe (default: order)
//!   BYBIT_RECONNECT=1             # Reopen the stream when it drops

use bybit_trading::client::websocket::ReconnectConfig;
use bybit_trading::types::WsMessage;
use bybit_trading::{BybitClient, Config, Error};

fn print_message(msg: Result<WsMessage, Error>) {
    match msg {
        Ok(WsMessage::Op(ack)) => {
            println!("[{}] success: {} {}", ack.op, ack.is_success(), ack.ret_msg);
        }
        Ok(WsMessage::Topic(topic)) => match topic.order_updates() {
            Some(Ok(updates)) => {
                for update in updates {
                    println!(
                        "[ORDER] {} {:?} {} @ {} | {} | id: {}",
                        update.symbol,
                        update.side,
                        update.qty,
                        update.price,
                        update.order_status,
                        update.order_id
                    );
                }
            }
            _ => println!("[{}] {}", topic.topic, topic.data),
        },
        Err(e) => println!("[ERROR] {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bybit_trading=info".parse()?),
        )
        .init();

    let client = BybitClient::new(Config::from_env()?)?;
    let reconnect = std::env::var("BYBIT_RECONNECT").is_ok_and(|v| v == "1" || v == "true");

    println!("=== Bybit Private Stream ===");
    println!("(Press Ctrl+C to stop)\n");

    if reconnect {
        let mut stream = client
            .reconnecting_stream(ReconnectConfig::default())
            .await?;
        while let Some(msg) = stream.next().await {
            print_message(msg);
        }
    } else {
        let mut stream = client.private_stream().await?;
        println!("Subscribed to {:?}\n", stream.topics());
        stream.run(print_message).await;
        println!("Stream closed");
    }

    Ok(())
}
