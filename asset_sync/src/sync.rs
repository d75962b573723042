//! Incremental fetch-and-merge for per-symbol price datasets.
//!
//! For one symbol the engine:
//! 1. reads the last stored timestamp;
//! 2. with nothing stored, requests full history and seeds a new dataset;
//! 3. otherwise computes `start = last + step` and, only if `start` is in the
//!    past, requests `[start, now)` and appends what came back.
//!
//! Rows handed to the store are always sorted, unique by timestamp and strictly
//! newer than what is already on disk, whatever the provider returned.

use chrono::{DateTime, FixedOffset, Utc};
use market_data_ingestor::{
    models::{bar::PriceBar, request_params::HistoryRange},
    providers::{MarketDataClient, ProviderError},
};

use crate::store::{StoreError, dataset::DatasetStore};

#[derive(thiserror::Error, Debug)]
/// Errors that abort one symbol's sync.
pub enum SyncError {
    #[error(transparent)]
    /// The local dataset could not be read or appended to.
    Store(#[from] StoreError),

    #[error("history request for {symbol} failed: {source}")]
    /// The provider call failed.
    Provider {
        /// Provider-side symbol that was requested.
        symbol: String,
        /// Underlying provider error.
        source: ProviderError,
    },

    #[error("{ticker}: next period after {last} is out of range for step {step}")]
    /// `last + step` cannot be represented.
    StepOverflow {
        /// Dataset ticker.
        ticker: String,
        /// Last stored timestamp.
        last: DateTime<FixedOffset>,
        /// Configured step.
        step: chrono::Duration,
    },
}

/// What a sync did to the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// No dataset existed; full history was written.
    Bootstrapped {
        /// Rows written, including the first.
        rows: usize,
    },
    /// New rows were appended after the existing ones.
    Appended {
        /// Rows written.
        rows: usize,
        /// First appended timestamp.
        first: DateTime<FixedOffset>,
        /// Last appended timestamp.
        last: DateTime<FixedOffset>,
    },
    /// The next period has not started yet; no request was made.
    UpToDate,
    /// A request was made but nothing newer than the stored data came back.
    NothingNew,
}

/// Keeps one dataset store in step with a market data provider.
pub struct SyncEngine<'a> {
    client: &'a dyn MarketDataClient,
    store: &'a DatasetStore,
    step: chrono::Duration,
}

impl<'a> SyncEngine<'a> {
    /// Engine that treats consecutive rows as `step` apart.
    pub fn new(
        client: &'a dyn MarketDataClient,
        store: &'a DatasetStore,
        step: chrono::Duration,
    ) -> Self {
        Self {
            client,
            store,
            step,
        }
    }

    /// Brings the dataset `ticker` up to date, requesting `provider_symbol`
    /// (e.g. `BTC-USD` for the `BTC` dataset).
    pub async fn sync(
        &self,
        ticker: &str,
        provider_symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(last) = self.store.last_timestamp(ticker)? else {
            return self.bootstrap(ticker, provider_symbol).await;
        };

        let start = last
            .with_timezone(&Utc)
            .checked_add_signed(self.step)
            .ok_or_else(|| SyncError::StepOverflow {
                ticker: ticker.to_string(),
                last,
                step: self.step,
            })?;
        if start >= now {
            tracing::info!(ticker, last = %last, next = %start, "dataset up to date");
            return Ok(SyncOutcome::UpToDate);
        }

        tracing::info!(ticker, from = %start, to = %now, "fetching missing window");
        let fetched = self
            .fetch(provider_symbol, HistoryRange::Since { start })
            .await?;
        let rows = newer_than(normalize(ticker, fetched), last, ticker);

        let (Some(first), Some(newest)) = (rows.first(), rows.last()) else {
            tracing::info!(ticker, from = %start, "provider returned nothing new");
            return Ok(SyncOutcome::NothingNew);
        };
        let (first, newest) = (first.timestamp, newest.timestamp);

        let written = self.store.append(ticker, &rows)?;
        tracing::info!(
            ticker,
            rows = written,
            first = %first,
            last = %newest,
            "appended rows"
        );
        Ok(SyncOutcome::Appended {
            rows: written,
            first,
            last: newest,
        })
    }

    async fn bootstrap(
        &self,
        ticker: &str,
        provider_symbol: &str,
    ) -> Result<SyncOutcome, SyncError> {
        tracing::info!(ticker, "no local dataset, fetching full history");
        let fetched = self.fetch(provider_symbol, HistoryRange::Max).await?;
        let rows = normalize(ticker, fetched);
        let written = self.store.append(ticker, &rows)?;
        if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
            tracing::info!(
                ticker,
                rows = written,
                first = %first.timestamp,
                last = %last.timestamp,
                "dataset created"
            );
        } else {
            tracing::warn!(ticker, "provider returned no history; dataset not created");
        }
        Ok(SyncOutcome::Bootstrapped { rows: written })
    }

    async fn fetch(&self, symbol: &str, range: HistoryRange) -> Result<Vec<PriceBar>, SyncError> {
        self.client
            .get_price_history(symbol, range)
            .await
            .map_err(|source| SyncError::Provider {
                symbol: symbol.to_string(),
                source,
            })
    }
}

/// Sorts by timestamp and keeps the first row of each timestamp.
pub fn normalize(ticker: &str, mut rows: Vec<PriceBar>) -> Vec<PriceBar> {
    rows.sort_by_key(|bar| bar.timestamp);
    let before = rows.len();
    rows.dedup_by_key(|bar| bar.timestamp);
    if rows.len() != before {
        tracing::warn!(
            ticker,
            dropped = before - rows.len(),
            "provider returned duplicate timestamps"
        );
    }
    rows
}

/// Drops rows at or before `last`.
fn newer_than(rows: Vec<PriceBar>, last: DateTime<FixedOffset>, ticker: &str) -> Vec<PriceBar> {
    let before = rows.len();
    let kept: Vec<PriceBar> = rows.into_iter().filter(|bar| bar.timestamp > last).collect();
    if kept.len() != before {
        tracing::warn!(
            ticker,
            dropped = before - kept.len(),
            last = %last,
            "provider returned rows already stored"
        );
    }
    kept
}
