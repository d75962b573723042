//! Provider-facing half of the pipeline: canonical market data models and the
//! REST clients that produce them.
//!
//! Everything that touches the network lives here. Persistence and the
//! incremental sync logic live in the `asset_sync` crate, which only sees the
//! [`providers::MarketDataClient`] and [`providers::MarketSnapshotClient`]
//! traits.

pub mod models;
pub mod providers;
