//! Where the list of equity symbols to snapshot comes from.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexSet;
use serde::Deserialize;

/// Supplies the symbols to process on this run.
#[async_trait]
pub trait WatchlistProvider: Send + Sync {
    /// Current watchlist, normalized (trimmed, uppercase, unique, original order).
    async fn get_watchlist(&self) -> Vec<String>;
}

/// Fixed list, used directly or as the fallback of [`HttpWatchlist`].
#[derive(Debug, Clone, Default)]
pub struct StaticWatchlist {
    symbols: Vec<String>,
}

impl StaticWatchlist {
    /// Wraps `symbols` (normalized on construction).
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: normalize_symbols(symbols),
        }
    }
}

#[async_trait]
impl WatchlistProvider for StaticWatchlist {
    async fn get_watchlist(&self) -> Vec<String> {
        self.symbols.clone()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WatchlistBody {
    Plain(Vec<String>),
    Wrapped { symbols: Vec<String> },
}

/// Watchlist served as JSON (`["AAPL", ...]` or `{"symbols": [...]}`) over HTTP.
///
/// Any failure (network, status, body) falls back to the static list.
pub struct HttpWatchlist {
    client: reqwest::Client,
    url: String,
    fallback: StaticWatchlist,
}

impl HttpWatchlist {
    /// Provider for `url`, bounded by `timeout`, falling back to `fallback`.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        fallback: StaticWatchlist,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            url: url.into(),
            fallback,
        })
    }

    async fn fetch(&self) -> reqwest::Result<Vec<String>> {
        let body: WatchlistBody = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(match body {
            WatchlistBody::Plain(s) | WatchlistBody::Wrapped { symbols: s } => normalize_symbols(s),
        })
    }
}

#[async_trait]
impl WatchlistProvider for HttpWatchlist {
    async fn get_watchlist(&self) -> Vec<String> {
        let symbols = match self.fetch().await {
            Ok(symbols) => {
                tracing::info!(url = %self.url, count = symbols.len(), "watchlist fetched");
                symbols
            }
            Err(e) => {
                let symbols = self.fallback.get_watchlist().await;
                tracing::warn!(
                    url = %self.url,
                    error = %e,
                    count = symbols.len(),
                    "watchlist unavailable, using fallback"
                );
                symbols
            }
        };
        if symbols.is_empty() {
            tracing::warn!("watchlist is empty");
        }
        symbols
    }
}

/// Trims, uppercases and de-duplicates while keeping first-seen order.
pub fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}
