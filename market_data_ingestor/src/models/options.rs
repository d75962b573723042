//! Option chain models.

use chrono::{DateTime, Utc};

/// One listed option contract as reported by the provider.
///
/// All provider fields are kept; callers decide which of them are noise.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionContract {
    /// OCC-style symbol, e.g. `AAPL250117C00150000`.
    pub contract_symbol: String,
    /// Time of the last trade, if it ever traded.
    pub last_trade_date: Option<DateTime<Utc>>,
    /// Strike price.
    pub strike: f64,
    /// Last traded price.
    pub last_price: Option<f64>,
    /// Best bid.
    pub bid: Option<f64>,
    /// Best ask.
    pub ask: Option<f64>,
    /// Price change since the previous close.
    pub change: Option<f64>,
    /// Percent change since the previous close.
    pub percent_change: Option<f64>,
    /// Contracts traded today.
    pub volume: Option<u64>,
    /// Open contracts.
    pub open_interest: Option<u64>,
    /// Implied volatility as a fraction (`0.42` = 42%).
    pub implied_volatility: Option<f64>,
    /// Whether the contract is in the money.
    pub in_the_money: bool,
    /// Contract size label, e.g. `REGULAR`.
    pub contract_size: Option<String>,
    /// Pricing currency.
    pub currency: Option<String>,
}

/// Calls and puts for a single underlying and expiry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionChain {
    /// Call contracts.
    pub calls: Vec<OptionContract>,
    /// Put contracts.
    pub puts: Vec<OptionContract>,
}
