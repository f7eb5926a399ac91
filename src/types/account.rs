//! Account types.

use serde::Deserialize;

/// Query for `GET /v5/account/wallet-balance`
#[derive(Debug, Clone)]
pub struct WalletBalanceQuery {
    /// Account type, e.g. `UNIFIED`
    pub account_type: String,
    /// Coin filter, e.g. `USDT`
    pub coin: Option<String>,
}

impl WalletBalanceQuery {
    /// Query a unified account, optionally for one coin
    pub fn unified(coin: Option<&str>) -> Self {
        Self {
            account_type: "UNIFIED".to_string(),
            coin: coin.map(String::from),
        }
    }

    /// Render the query string exactly as it is signed and sent
    pub fn to_query_string(&self) -> String {
        let mut pairs = url::form_urlencoded::Serializer::new(String::new());
        pairs.append_pair("accountType", &self.account_type);
        if let Some(coin) = &self.coin {
            pairs.append_pair("coin", coin);
        }
        pairs.finish()
    }
}

/// `result` of a wallet-balance request
#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceResult {
    /// One entry per account
    #[serde(default)]
    pub list: Vec<WalletAccount>,
}

/// Balances of one account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    /// Account type
    pub account_type: String,
    /// Total equity in USD
    #[serde(default)]
    pub total_equity: String,
    /// Total wallet balance in USD
    #[serde(default)]
    pub total_wallet_balance: String,
    /// Total available balance in USD
    #[serde(default)]
    pub total_available_balance: String,
    /// Per-coin balances
    #[serde(default)]
    pub coin: Vec<CoinBalance>,
}

/// Balance of one coin
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinBalance {
    /// Coin name
    pub coin: String,
    /// Equity
    #[serde(default)]
    pub equity: String,
    /// Wallet balance
    #[serde(default)]
    pub wallet_balance: String,
    /// Locked in open orders
    #[serde(default)]
    pub locked: String,
    /// USD value
    #[serde(default)]
    pub usd_value: String,
}

impl WalletBalanceResult {
    /// Find a coin's wallet balance across all accounts
    pub fn wallet_balance(&self, coin: &str) -> Option<&str> {
        self.list
            .iter()
            .flat_map(|account| account.coin.iter())
            .find(|c| c.coin == coin)
            .map(|c| c.wallet_balance.as_str())
    }
}
