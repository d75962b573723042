//! Yahoo Finance REST client (v8 chart API and v7 options API).

pub mod params;
pub mod provider;
pub mod response;

pub use provider::YahooClient;
