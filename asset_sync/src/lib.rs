//! Incremental market-data sync.
//!
//! Keeps per-symbol crypto price datasets, a BTC dominance series and daily
//! option chain snapshots up to date from external providers, then notifies
//! subscribers about the watchlist. Provider access lives in
//! `market_data_ingestor`; this crate owns persistence, the sync logic and the
//! run pipeline.

#![deny(missing_docs)]

pub mod config;
pub mod dominance;
pub mod notify;
pub mod options;
pub mod pipeline;
pub mod retry;
pub mod store;
pub mod sync;
pub mod timeframe;
pub mod tz;
pub mod watchlist;
