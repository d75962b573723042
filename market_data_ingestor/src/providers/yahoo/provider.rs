use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use crate::{
    models::{bar::PriceBar, options::OptionChain, request_params::HistoryRange},
    providers::{
        ApiSnafu, ClientBuildSnafu, InternalSnafu, InvalidBaseUrlSnafu, MarketDataClient,
        ProviderError, ProviderInitError, ReqwestSnafu, ValidationSnafu,
        yahoo::{
            params::{chart_query, expiry_query},
            response::{ChartResponse, OptionsResponse},
        },
    },
};

const BASE_URL: &str = "https://query2.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// Yahoo Finance market data client.
///
/// Requests are paced by a client-wide rate limiter so a long watchlist does
/// not trip Yahoo's throttling.
pub struct YahooClient {
    client: Client,
    base_url: Url,
    limiter: DefaultDirectRateLimiter,
}

impl YahooClient {
    /// Creates a client against the public Yahoo Finance endpoints.
    pub fn new(timeout: Duration) -> Result<Self, ProviderInitError> {
        Self::with_base_url(BASE_URL, timeout)
    }

    /// Creates a client against an alternative host (mirror, proxy, test server).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ProviderInitError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            InvalidBaseUrlSnafu {
                url: base_url,
                message: e.to_string(),
            }
            .build()
        })?;
        if base_url.cannot_be_a_base() {
            return InvalidBaseUrlSnafu {
                url: base_url.as_str(),
                message: "URL cannot be a base",
            }
            .fail();
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url,
            limiter: RateLimiter::direct(Quota::per_second(nonzero!(2u32))),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `with_base_url` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(String, String)],
    ) -> Result<T, ProviderError> {
        self.limiter.until_ready().await;
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }

        response.json::<T>().await.context(ReqwestSnafu)
    }
}

fn validate_symbol(symbol: &str) -> Result<(), ProviderError> {
    if symbol.trim().is_empty() {
        return ValidationSnafu {
            message: "symbol must not be empty",
        }
        .fail();
    }
    Ok(())
}

#[async_trait]
impl MarketDataClient for YahooClient {
    async fn get_price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        validate_symbol(symbol)?;
        let now = Utc::now();
        if let HistoryRange::Since { start } = range {
            if start >= now {
                return ValidationSnafu {
                    message: format!("history start {start} is not before now {now}"),
                }
                .fail();
            }
        }

        let url = self.endpoint(&["v8", "finance", "chart", symbol]);
        let response: ChartResponse = self.get_json(url, &chart_query(range, now)).await?;
        response.into_bars(symbol)
    }

    async fn list_expiries(&self, symbol: &str) -> Result<Vec<NaiveDate>, ProviderError> {
        validate_symbol(symbol)?;
        let url = self.endpoint(&["v7", "finance", "options", symbol]);
        let response: OptionsResponse = self.get_json(url, &[]).await?;
        response.into_expiries(symbol)
    }

    async fn get_option_chain(
        &self,
        symbol: &str,
        expiry: NaiveDate,
    ) -> Result<OptionChain, ProviderError> {
        validate_symbol(symbol)?;
        let url = self.endpoint(&["v7", "finance", "options", symbol]);
        let response: OptionsResponse = self.get_json(url, &expiry_query(expiry)).await?;
        let chain = response.into_chain(symbol)?;
        if chain.calls.is_empty() && chain.puts.is_empty() {
            return InternalSnafu {
                message: format!("no contracts listed for {symbol} expiring {expiry}"),
            }
            .fail();
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_symbol_segment() {
        let client = YahooClient::with_base_url("https://example.test/", Duration::from_secs(1))
            .expect("client");
        let url = client.endpoint(&["v8", "finance", "chart", "BRK/B"]);
        assert_eq!(url.as_str(), "https://example.test/v8/finance/chart/BRK%2FB");
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = YahooClient::with_base_url("not a url", Duration::from_secs(1))
            .err()
            .expect("must fail");
        assert!(matches!(err, ProviderInitError::InvalidBaseUrl { .. }));

        let err = YahooClient::with_base_url("mailto:ops@example.test", Duration::from_secs(1))
            .err()
            .expect("must fail");
        assert!(matches!(err, ProviderInitError::InvalidBaseUrl { .. }));
    }

    #[tokio::test]
    async fn empty_symbol_fails_before_any_request() {
        let client = YahooClient::with_base_url("http://127.0.0.1:9", Duration::from_millis(50))
            .expect("client");
        let err = client.list_expiries("  ").await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation { .. }));
    }
}
