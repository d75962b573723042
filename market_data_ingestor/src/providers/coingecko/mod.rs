//! CoinGecko REST client (`/coins/markets`).

pub mod provider;

pub use provider::CoinGeckoClient;
