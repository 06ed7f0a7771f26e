//! Provider abstractions for the upstream market-data APIs

use crate::{
    error::ProviderError,
    types::{CoinDirectoryEntry, ListingQuery, ListingSet},
};
use async_trait::async_trait;

/// Source of ranked listings (CoinMarketCap in production)
#[async_trait]
pub trait ListingsProvider: Send + Sync {
    /// Fetches the latest listings
    ///
    /// # Arguments
    /// * `query` - Validated limit and sort order
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<ListingSet, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

/// Source of the full coin directory used for name → id resolution
#[async_trait]
pub trait CoinDirectoryProvider: Send + Sync {
    async fn fetch_coin_directory(&self) -> Result<Vec<CoinDirectoryEntry>, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

/// Source of the comparison price
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetches the USD price of a coin
    ///
    /// # Returns
    /// `Ok(None)` when the provider does not list `coin_id`. That is a valid
    /// answer, distinct from a failed request.
    async fn fetch_price(&self, coin_id: &str) -> Result<Option<f64>, ProviderError>;

    fn provider_name(&self) -> &'static str;
}
