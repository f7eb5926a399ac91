//! Place a limit order, then cancel every open order on the symbol
//!
//! Usage:
//!   BYBIT_API_KEY=xxx BYBIT_SECRET_KEY=yyy cargo run --example create_order
//!
//! Optional:
//!   BYBIT_TESTNET=1        # Use testnet (default: mainnet)
//!   BYBIT_SYMBOL=MATICUSDC # Symbol to trade
//!   BYBIT_QTY=1.0          # Order quantity
//!   BYBIT_PRICE=0.7        # Limit price

use bybit_trading::types::{CancelAllRequest, Category, OrderRequest, Side, WalletBalanceQuery};
use bybit_trading::{BybitClient, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bybit_trading=debug".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let symbol = std::env::var("BYBIT_SYMBOL").unwrap_or_else(|_| "MATICUSDC".to_string());
    let qty = std::env::var("BYBIT_QTY").unwrap_or_else(|_| "1.0".to_string());
    let price = std::env::var("BYBIT_PRICE").unwrap_or_else(|_| "0.7".to_string());

    let client = BybitClient::new(config)?;

    let balance = client
        .rest()
        .get_wallet_balance(&WalletBalanceQuery::unified(Some("USDC")))
        .await?;
    println!(
        "USDC balance: {}",
        balance.result.wallet_balance("USDC").unwrap_or("0")
    );

    let order = OrderRequest::limit(&symbol, Side::Buy, &qty, &price);
    println!("Placing {:?} {} {} @ {}", order.side, qty, symbol, price);

    match client.rest().create_order(&order).await {
        Ok(response) => println!(
            "[{}] order {} accepted in {:?}\n{}",
            response.status, response.result.order_id, response.latency, response.body
        ),
        Err(e) => println!("order failed ({:?}): {}", e.kind(), e),
    }

    let cancel = CancelAllRequest::new(Category::Spot).with_symbol(&symbol);
    let cancelled = client.rest().cancel_all_orders(&cancel).await?;
    println!(
        "Cancelled {} order(s) in {:?}",
        cancelled.result.list.len(),
        cancelled.latency
    );

    Ok(())
}
