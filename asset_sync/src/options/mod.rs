//! Daily option chain snapshots.
//!
//! For one underlying the fetcher lists every expiry, pulls each chain under a
//! [`RetryPolicy`], flattens calls (and optionally puts) into [`SnapshotRow`]s,
//! sorts them by `(optionType, expiry, strike)` and hands the table to a
//! [`SnapshotWriter`]. An expiry that keeps failing is skipped; a contract
//! symbol that cannot be parsed, or an empty table, fails the whole snapshot.

pub mod row;

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use market_data_ingestor::providers::MarketDataClient;

pub use row::{OptionType, SnapshotRow};

use crate::{
    retry::{RetryError, RetryPolicy, Sleeper, retry},
    store::{StoreError, snapshot::SnapshotWriter},
    tz::as_of_date,
};

#[derive(thiserror::Error, Debug)]
/// Reasons a snapshot could not be produced.
pub enum SnapshotError {
    #[error("could not list expiries for {symbol}: {source}")]
    /// Expiry enumeration failed even after retries.
    Expiries {
        /// Underlying symbol.
        symbol: String,
        /// Last error.
        source: RetryError,
    },

    #[error("contract symbol {contract:?} of {symbol} does not encode an option type")]
    /// A contract symbol did not match `<root><YYMMDD><C|P><strike>`.
    ContractSymbol {
        /// Underlying symbol.
        symbol: String,
        /// Offending contract symbol.
        contract: String,
    },

    #[error("no option contracts collected for {symbol}")]
    /// Every expiry was skipped or empty.
    Empty {
        /// Underlying symbol.
        symbol: String,
    },

    #[error(transparent)]
    /// The snapshot file could not be written.
    Store(#[from] StoreError),
}

/// A sorted snapshot ready to be written.
#[derive(Debug, Clone)]
pub struct OptionSnapshot {
    /// Underlying symbol.
    pub symbol: String,
    /// Rows in snapshot order.
    pub rows: Vec<SnapshotRow>,
    /// Expiries dropped after exhausting retries.
    pub skipped_expiries: Vec<NaiveDate>,
}

/// Builds option snapshots from a market data client.
pub struct OptionChainFetcher<'a> {
    client: &'a dyn MarketDataClient,
    sleeper: &'a dyn Sleeper,
    include_puts: bool,
    policy: RetryPolicy,
}

impl<'a> OptionChainFetcher<'a> {
    /// Fetcher with the given retry policy. Puts are included.
    pub fn new(
        client: &'a dyn MarketDataClient,
        sleeper: &'a dyn Sleeper,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            sleeper,
            include_puts: true,
            policy,
        }
    }

    /// Whether put contracts are part of the snapshot.
    pub fn include_puts(mut self, include: bool) -> Self {
        self.include_puts = include;
        self
    }

    /// Collects, cleans and sorts the full chain of `symbol`.
    pub async fn build_snapshot(&self, symbol: &str) -> Result<OptionSnapshot, SnapshotError> {
        let client = self.client;
        let expiries = retry(&self.policy, self.sleeper, &format!("{symbol} expiries"), move || {
            client.list_expiries(symbol)
        })
        .await
        .map_err(|source| SnapshotError::Expiries {
            symbol: symbol.to_string(),
            source,
        })?;
        tracing::info!(symbol, expiries = expiries.len(), "listing option chains");

        let mut rows = Vec::new();
        let mut skipped_expiries = Vec::new();
        for expiry in expiries {
            let label = format!("{symbol} {expiry}");
            let chain = match retry(&self.policy, self.sleeper, &label, move || {
                client.get_option_chain(symbol, expiry)
            })
            .await
            {
                Ok(chain) => chain,
                Err(e) => {
                    tracing::error!(
                        symbol,
                        %expiry,
                        attempts = e.attempts,
                        error = %e.source,
                        "skipping expiry"
                    );
                    skipped_expiries.push(expiry);
                    continue;
                }
            };

            let puts = if self.include_puts { chain.puts } else { Vec::new() };
            for contract in chain.calls.into_iter().chain(puts) {
                let contract_symbol = contract.contract_symbol.clone();
                let row = SnapshotRow::from_contract(contract, expiry).ok_or_else(|| {
                    SnapshotError::ContractSymbol {
                        symbol: symbol.to_string(),
                        contract: contract_symbol,
                    }
                })?;
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(SnapshotError::Empty {
                symbol: symbol.to_string(),
            });
        }
        rows.sort_by(SnapshotRow::snapshot_order);

        Ok(OptionSnapshot {
            symbol: symbol.to_string(),
            rows,
            skipped_expiries,
        })
    }

    /// Builds the snapshot and writes it for the UTC date of `now`.
    pub async fn fetch_and_write(
        &self,
        writer: &SnapshotWriter,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<(PathBuf, OptionSnapshot), SnapshotError> {
        let snapshot = self.build_snapshot(symbol).await?;
        let path = writer.write(symbol, as_of_date(now), &snapshot.rows)?;
        tracing::info!(
            symbol,
            rows = snapshot.rows.len(),
            skipped = snapshot.skipped_expiries.len(),
            path = %path.display(),
            "option snapshot saved"
        );
        Ok((path, snapshot))
    }
}
