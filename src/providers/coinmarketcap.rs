//! CoinMarketCap listings provider

use crate::{
    constants::{CMC_API_KEY_HEADER, LISTINGS_URL, REQUEST_TIMEOUT_SECS},
    error::ProviderError,
    provider::ListingsProvider,
    types::{ListingQuery, ListingSet},
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::http::{build_client, get_json};

/// CoinMarketCap "listings/latest" provider
pub struct CoinMarketCapProvider {
    client: Client,
    url: String,
    api_key: String,
}

impl CoinMarketCapProvider {
    /// Creates a provider against the public listings endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_endpoint(LISTINGS_URL, api_key, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_endpoint(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    /// Query parameters for a listings request
    fn query_params(query: &ListingQuery) -> [(&'static str, String); 2] {
        [
            ("sort", query.sort().as_str().to_string()),
            ("limit", query.limit().to_string()),
        ]
    }
}

#[async_trait]
impl ListingsProvider for CoinMarketCapProvider {
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<ListingSet, ProviderError> {
        tracing::debug!(
            limit = query.limit(),
            sort = %query.sort(),
            "Fetching listings from CoinMarketCap"
        );

        let request = self
            .client
            .get(&self.url)
            .query(&Self::query_params(query))
            .header(CMC_API_KEY_HEADER, &self.api_key);
        let listings: ListingSet = get_json(self.provider_name(), request).await?;

        if listings.status.error_code != 0 {
            tracing::warn!(
                error_code = listings.status.error_code,
                error_message = listings.status.error_message.as_deref().unwrap_or(""),
                "CoinMarketCap reported an error in its status envelope"
            );
        }

        tracing::debug!(
            count = listings.len(),
            credits = listings.status.credit_count,
            "Successfully fetched listings from CoinMarketCap"
        );

        Ok(listings)
    }

    fn provider_name(&self) -> &'static str {
        "coinmarketcap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortOrder;

    #[test]
    fn test_query_params() {
        let query = ListingQuery::new(50, SortOrder::PercentChange7d).unwrap();
        let params = CoinMarketCapProvider::query_params(&query);
        assert_eq!(params[0], ("sort", "percent_change_7d".to_string()));
        assert_eq!(params[1], ("limit", "50".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_listings_sends_query_and_credentials() {
        use crate::providers::http::spawn_test_server;
        use axum::{extract::Query, http::HeaderMap, http::StatusCode, routing::get};
        use std::collections::HashMap;
        use std::sync::{Arc, Mutex};

        type Seen = Arc<Mutex<Option<(HashMap<String, String>, Option<String>)>>>;
        let seen: Seen = Arc::default();
        let recorder = seen.clone();

        let router = axum::Router::new()
            .route(
                "/listings",
                get(
                    move |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| {
                        let recorder = recorder.clone();
                        async move {
                            let key = headers
                                .get("x-cmc_pro_api_key")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            *recorder.lock().unwrap() = Some((params, key));
                            r#"{"status":{"timestamp":"2024-05-01T12:00:00.000Z","error_code":0},"data":[]}"#
                        }
                    },
                ),
            )
            .route(
                "/unavailable",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
            );
        let base = spawn_test_server(router).await;

        let provider = CoinMarketCapProvider::with_endpoint(
            format!("{base}/listings"),
            "cmc-secret",
            Duration::from_secs(5),
        )
        .unwrap();
        let query = ListingQuery::new(25, SortOrder::Volume24h).unwrap();
        let listings = provider.fetch_listings(&query).await.unwrap();
        assert!(listings.is_empty());

        let (params, key) = seen.lock().unwrap().take().unwrap();
        assert_eq!(params.get("sort").map(String::as_str), Some("volume_24h"));
        assert_eq!(params.get("limit").map(String::as_str), Some("25"));
        assert_eq!(key.as_deref(), Some("cmc-secret"));

        let failing = CoinMarketCapProvider::with_endpoint(
            format!("{base}/unavailable"),
            "cmc-secret",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(matches!(
            failing.fetch_listings(&query).await,
            Err(ProviderError::ApiError { status: 503 })
        ));
    }

    #[test]
    fn test_provider_name() {
        let provider = CoinMarketCapProvider::new("cmc-key").unwrap();
        assert_eq!(provider.provider_name(), "coinmarketcap");
    }
}
