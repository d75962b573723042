//! Canonical in-memory representation of a daily price bar.
//!
//! This struct is the standard output of
//! [`MarketDataClient::get_price_history`](crate::providers::MarketDataClient::get_price_history),
//! regardless of asset class (equities, crypto pairs, etc.).

use chrono::{DateTime, FixedOffset};

/// A single time-series row (OHLCV plus corporate actions) for one period.
///
/// The timestamp keeps the exchange's UTC offset so it can be written back out
/// exactly as the provider reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    /// Start of the period, with the exchange's UTC offset.
    pub timestamp: DateTime<FixedOffset>,

    /// Opening price.
    pub open: f64,

    /// Highest price during the period.
    pub high: f64,

    /// Lowest price during the period.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the period.
    pub volume: f64,

    /// Cash dividend paid on this period, `0.0` when none.
    pub dividends: f64,

    /// Split ratio applied on this period, `0.0` when none.
    pub stock_splits: f64,
}
