//! Provider abstraction for market data sources.
//!
//! Two traits cover everything the pipeline needs from the outside world:
//!
//! - [`MarketDataClient`]: per-symbol price history and option chains
//!   (implemented by [`yahoo::YahooClient`]).
//! - [`MarketSnapshotClient`]: a ranked, market-wide capitalisation snapshot
//!   (implemented by [`coingecko::CoinGeckoClient`]).
//!
//! Both are async and object safe, so callers can hold `&dyn MarketDataClient`
//! and tests can substitute in-memory fakes.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::market::CoinMarketCap;
//! use market_data_ingestor::providers::{MarketSnapshotClient, ProviderError};
//!
//! struct FixedSnapshot;
//!
//! #[async_trait]
//! impl MarketSnapshotClient for FixedSnapshot {
//!     async fn get_market_snapshot(
//!         &self,
//!         _vs_currency: &str,
//!         _top_n: u32,
//!     ) -> Result<Vec<CoinMarketCap>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod coingecko;
pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use snafu::{Backtrace, Snafu};

use crate::models::{
    bar::PriceBar, market::CoinMarketCap, options::OptionChain, request_params::HistoryRange,
};

/// Per-symbol market data: price history and listed options.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetches daily bars for `symbol`, ascending by timestamp.
    ///
    /// With [`HistoryRange::Since`] the provider returns bars whose period
    /// starts at or after `start`, through the current period.
    async fn get_price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<Vec<PriceBar>, ProviderError>;

    /// Lists the expiry dates that currently have a listed chain.
    async fn list_expiries(&self, symbol: &str) -> Result<Vec<NaiveDate>, ProviderError>;

    /// Fetches the calls and puts for one expiry.
    async fn get_option_chain(
        &self,
        symbol: &str,
        expiry: NaiveDate,
    ) -> Result<OptionChain, ProviderError>;
}

/// Market-wide capitalisation snapshot.
#[async_trait]
pub trait MarketSnapshotClient: Send + Sync {
    /// Returns up to `top_n` coins ranked by market cap, priced in `vs_currency`.
    async fn get_market_snapshot(
        &self,
        vs_currency: &str,
        top_n: u32,
    ) -> Result<Vec<CoinMarketCap>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// A configured base URL could not be parsed.
    #[snafu(display("Invalid base URL {url:?}: {message}"))]
    InvalidBaseUrl {
        url: String,
        message: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a provider implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout, bad body).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API answered with an error status or error payload.
    #[snafu(display("API error (status {status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The provider answered, but the payload could not be turned into rows.
    #[snafu(display("Internal provider error: {message}"))]
    Internal {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Bad parameters and broken configuration fail the same way every time;
    /// everything else (network trouble, upstream 5xx/429, malformed payloads
    /// from a flaky endpoint) is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProviderError::Validation { .. } | ProviderError::Init { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_and_init_are_not_retryable() {
        let validation = ValidationSnafu { message: "top_n must be 1..=250" }.build();
        assert!(!validation.is_retryable());

        let init = ProviderError::Init {
            source: InvalidBaseUrlSnafu {
                url: "nope",
                message: "relative URL without a base",
            }
            .build(),
        };
        assert!(!init.is_retryable());
    }

    #[test]
    fn upstream_failures_are_retryable() {
        let api = ApiSnafu { status: 503u16, message: "unavailable" }.build();
        assert!(api.is_retryable());
        assert_eq!(api.to_string(), "API error (status 503): unavailable");

        let internal = InternalSnafu { message: "no quote data" }.build();
        assert!(internal.is_retryable());
    }
}
