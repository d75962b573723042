//! Reference-coin dominance: its share of the total market cap of the top-N coins.

use chrono::{DateTime, Utc};
use market_data_ingestor::{
    models::market::CoinMarketCap,
    providers::{MarketSnapshotClient, ProviderError},
};

use crate::{
    config::DominanceConfig,
    store::{
        StoreError,
        dominance::{DominanceSample, DominanceSeries},
    },
    tz::truncate_to_minute,
};

#[derive(thiserror::Error, Debug)]
/// Reasons a dominance sample could not be produced.
pub enum DominanceError {
    #[error("market snapshot has no entry for {id:?}")]
    /// The reference coin was not part of the snapshot.
    MissingReference {
        /// Identifier that was looked for.
        id: String,
    },

    #[error("total market cap of the snapshot is zero")]
    /// Nothing to divide by.
    ZeroTotal,

    #[error("market cap of {id:?} is not a finite non-negative number: {value}")]
    /// The provider reported a negative or non-finite cap.
    InvalidCap {
        /// Offending coin.
        id: String,
        /// Reported value.
        value: f64,
    },

    #[error("market snapshot request failed: {0}")]
    /// The snapshot request failed.
    Provider(#[source] ProviderError),

    #[error(transparent)]
    /// The sample could not be appended.
    Store(#[from] StoreError),
}

/// `reference cap / sum of all caps * 100`, rounded to two decimals.
///
/// The total includes the reference coin itself. Missing caps count as zero.
pub fn dominance_ratio(
    snapshot: &[CoinMarketCap],
    reference_id: &str,
) -> Result<f64, DominanceError> {
    let mut total = 0.0;
    let mut reference = None;
    for coin in snapshot {
        let cap = coin.cap_or_zero();
        if !cap.is_finite() || cap < 0.0 {
            return Err(DominanceError::InvalidCap {
                id: coin.id.clone(),
                value: cap,
            });
        }
        total += cap;
        if reference.is_none() && coin.id == reference_id {
            reference = Some(cap);
        }
    }

    let reference = reference.ok_or_else(|| DominanceError::MissingReference {
        id: reference_id.to_string(),
    })?;
    if total == 0.0 {
        return Err(DominanceError::ZeroTotal);
    }
    Ok((reference / total * 100.0 * 100.0).round() / 100.0)
}

/// Fetches a snapshot, computes the ratio and appends it to `series`.
pub async fn record_dominance(
    client: &dyn MarketSnapshotClient,
    series: &DominanceSeries,
    cfg: &DominanceConfig,
    now: DateTime<Utc>,
) -> Result<DominanceSample, DominanceError> {
    let snapshot = client
        .get_market_snapshot(&cfg.vs_currency, cfg.top_n)
        .await
        .map_err(DominanceError::Provider)?;
    tracing::debug!(coins = snapshot.len(), "market snapshot received");

    let ratio = dominance_ratio(&snapshot, &cfg.reference_id)?;
    let sample = DominanceSample {
        timestamp: truncate_to_minute(now),
        ratio,
    };
    series.append(&sample)?;
    tracing::info!(reference = %cfg.reference_id, ratio, "dominance recorded");
    Ok(sample)
}
