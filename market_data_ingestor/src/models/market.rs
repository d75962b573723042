//! Market-wide snapshot rows (ranked coins with their capitalisation).

use serde::Deserialize;

/// One entry of a ranked market snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoinMarketCap {
    /// Provider identifier, e.g. `"bitcoin"`.
    pub id: String,
    /// Ticker symbol, e.g. `"btc"`.
    #[serde(default)]
    pub symbol: String,
    /// Market capitalisation in the requested currency. Some providers
    /// report `null` for freshly listed coins.
    pub market_cap: Option<f64>,
}

impl CoinMarketCap {
    /// Market cap with a missing value counted as zero.
    pub fn cap_or_zero(&self) -> f64 {
        self.market_cap.unwrap_or(0.0)
    }
}
