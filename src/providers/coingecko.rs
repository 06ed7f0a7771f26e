//! CoinGecko provider: coin directory and comparison price

use crate::{
    constants::{COINGECKO_API_KEY_HEADER, COINGECKO_VS_CURRENCY, COIN_LIST_URL, REQUEST_TIMEOUT_SECS, SIMPLE_PRICE_URL},
    error::ProviderError,
    provider::{CoinDirectoryProvider, PriceProvider},
    types::CoinDirectoryEntry,
};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use super::http::{build_client, get_json};

/// CoinGecko simple price response: coin id → currency → price
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

/// CoinGecko provider
pub struct CoinGeckoProvider {
    client: Client,
    coin_list_url: String,
    simple_price_url: String,
    api_key: String,
}

impl CoinGeckoProvider {
    /// Creates a provider against the public CoinGecko endpoints
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_endpoints(
            COIN_LIST_URL,
            SIMPLE_PRICE_URL,
            api_key,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Creates a provider with explicit endpoints and timeout
    pub fn with_endpoints(
        coin_list_url: impl Into<String>,
        simple_price_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            coin_list_url: coin_list_url.into(),
            simple_price_url: simple_price_url.into(),
            api_key: api_key.into(),
        })
    }
}

/// Picks the USD price of `coin_id` out of a simple price response
fn usd_price(response: &SimplePriceResponse, coin_id: &str) -> Option<f64> {
    response
        .get(coin_id)
        .and_then(|currencies| currencies.get(COINGECKO_VS_CURRENCY))
        .copied()
}

#[async_trait]
impl CoinDirectoryProvider for CoinGeckoProvider {
    async fn fetch_coin_directory(&self) -> Result<Vec<CoinDirectoryEntry>, ProviderError> {
        tracing::debug!(url = %self.coin_list_url, "Fetching coin directory from CoinGecko");

        let request = self
            .client
            .get(&self.coin_list_url)
            .header(COINGECKO_API_KEY_HEADER, &self.api_key);
        let entries: Vec<CoinDirectoryEntry> =
            get_json(CoinDirectoryProvider::provider_name(self), request).await?;

        tracing::debug!(count = entries.len(), "Fetched coin directory from CoinGecko");
        Ok(entries)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko-coins-list"
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    async fn fetch_price(&self, coin_id: &str) -> Result<Option<f64>, ProviderError> {
        tracing::debug!(coin_id, "Fetching comparison price from CoinGecko");

        let request = self
            .client
            .get(&self.simple_price_url)
            .query(&[("ids", coin_id), ("vs_currencies", COINGECKO_VS_CURRENCY)])
            .header(COINGECKO_API_KEY_HEADER, &self.api_key);
        let response: SimplePriceResponse =
            get_json(PriceProvider::provider_name(self), request).await?;

        let price = usd_price(&response, coin_id);
        if price.is_none() {
            tracing::debug!(coin_id, "CoinGecko does not list coin");
        }
        Ok(price)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko-simple-price"
    }
}
