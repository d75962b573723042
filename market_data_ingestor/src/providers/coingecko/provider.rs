use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use snafu::ResultExt;

use crate::{
    models::market::CoinMarketCap,
    providers::{
        ApiSnafu, ClientBuildSnafu, InvalidBaseUrlSnafu, MarketSnapshotClient, ProviderError,
        ProviderInitError, ReqwestSnafu, ValidationSnafu,
    },
};

const BASE_URL: &str = "https://api.coingecko.com/api/v3/coins/markets";

/// CoinGecko allows at most this many rows per page.
pub const MAX_PER_PAGE: u32 = 250;

/// Ranked market-cap snapshot from CoinGecko.
pub struct CoinGeckoClient {
    client: Client,
    markets_url: Url,
}

impl CoinGeckoClient {
    pub fn new(timeout: Duration) -> Result<Self, ProviderInitError> {
        Self::with_markets_url(BASE_URL, timeout)
    }

    /// Points the client at a different `/coins/markets` endpoint.
    pub fn with_markets_url(url: &str, timeout: Duration) -> Result<Self, ProviderInitError> {
        let markets_url = Url::parse(url).map_err(|e| {
            InvalidBaseUrlSnafu {
                url,
                message: e.to_string(),
            }
            .build()
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context(ClientBuildSnafu)?;
        Ok(Self {
            client,
            markets_url,
        })
    }
}

/// Query string for the first page of coins ordered by market cap.
pub fn markets_query(
    vs_currency: &str,
    top_n: u32,
) -> Result<Vec<(String, String)>, ProviderError> {
    if vs_currency.trim().is_empty() {
        return ValidationSnafu {
            message: "vs_currency must not be empty",
        }
        .fail();
    }
    if !(1..=MAX_PER_PAGE).contains(&top_n) {
        return ValidationSnafu {
            message: format!("top_n must be within 1..={MAX_PER_PAGE}, got {top_n}"),
        }
        .fail();
    }

    Ok(vec![
        ("vs_currency".to_string(), vs_currency.trim().to_lowercase()),
        ("order".to_string(), "market_cap_desc".to_string()),
        ("per_page".to_string(), top_n.to_string()),
        ("page".to_string(), "1".to_string()),
        ("sparkline".to_string(), "false".to_string()),
    ])
}

#[async_trait]
impl MarketSnapshotClient for CoinGeckoClient {
    async fn get_market_snapshot(
        &self,
        vs_currency: &str,
        top_n: u32,
    ) -> Result<Vec<CoinMarketCap>, ProviderError> {
        let query = markets_query(vs_currency, top_n)?;
        tracing::debug!(url = %self.markets_url, top_n, "GET");

        let response = self
            .client
            .get(self.markets_url.clone())
            .query(&query)
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

        response
            .json::<Vec<CoinMarketCap>>()
            .await
            .context(ReqwestSnafu)
    }
}
