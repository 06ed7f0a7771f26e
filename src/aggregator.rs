//! Listing aggregation pipeline
//!
//! One call to [`ListingAggregator::aggregate`] runs the whole request:
//!
//! ```text
//! validate limit/order
//!     ↓
//! fetch_listings ──┬── fetch_coin_directory      (concurrent)
//!                  ↓
//! resolve coin id from the top listing's name
//!                  ↓
//! fetch_price(id) ─┬── average / median / stddev (concurrent)
//!                  ↓
//! AggregateResult
//! ```
//!
//! Each fan-out is a `try_join!`: the first failure drops the sibling futures,
//! so no upstream call or statistics task is left waiting on a request that
//! has already failed.

use crate::{
    constants::{MAX_CONCURRENT_UPSTREAM, USD},
    error::{AggregateError, ProviderError, StatsError},
    metrics::{ProviderMetrics, UpstreamMetrics},
    provider::{CoinDirectoryProvider, ListingsProvider, PriceProvider},
    stats,
    types::{
        AggregateResult, CoinDirectoryEntry, ComparisonPrice, ComponentHealth, HealthStatus,
        ListingQuery, ListingSet, PriceStatistics,
    },
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::Instrument;
use uuid::Uuid;

/// Success rate below which an upstream counts as degraded
const HEALTHY_SUCCESS_RATE: f64 = 0.9;

/// Resolves a listing name to the comparison provider's coin id
///
/// Returns the id of the first directory entry whose name matches
/// case-insensitively. When nothing matches, the name itself is returned and
/// used as the id; the price lookup will then usually come back empty.
pub fn resolve_coin_id(name: &str, directory: &[CoinDirectoryEntry]) -> String {
    directory
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name))
        .map(|entry| entry.id.clone())
        .unwrap_or_else(|| name.to_string())
}

/// Extracts the USD price of every listing
fn usd_prices(listings: &ListingSet, provider: &'static str) -> Result<Vec<f64>, AggregateError> {
    listings
        .data
        .iter()
        .map(|listing| {
            listing
                .quote_in(USD)
                .map(|quote| quote.price)
                .ok_or_else(|| AggregateError::Decode {
                    provider,
                    message: format!("listing {} has no {} quote", listing.symbol, USD),
                })
        })
        .collect()
}

/// Runs one statistic on the blocking pool
async fn run_stat(
    prices: Arc<[f64]>,
    stat: fn(&[f64]) -> Result<f64, StatsError>,
) -> Result<f64, AggregateError> {
    let value = tokio::task::spawn_blocking(move || stat(&prices))
        .await
        .map_err(|e| AggregateError::internal(format!("statistics task failed: {}", e)))??;
    Ok(value)
}

/// Computes average, median and standard deviation concurrently; max and min inline
async fn compute_statistics(prices: Arc<[f64]>) -> Result<PriceStatistics, AggregateError> {
    let (average, median, standard_deviation) = tokio::try_join!(
        run_stat(prices.clone(), stats::average),
        run_stat(prices.clone(), stats::median),
        run_stat(prices.clone(), stats::standard_deviation),
    )?;

    Ok(PriceStatistics {
        average,
        median,
        standard_deviation,
        max: stats::max(&prices)?,
        min: stats::min(&prices)?,
    })
}

/// Coordinates the upstream providers and the statistics engine
pub struct ListingAggregator {
    listings: Arc<dyn ListingsProvider>,
    directory: Arc<dyn CoinDirectoryProvider>,
    prices: Arc<dyn PriceProvider>,
    upstream_permits: Arc<Semaphore>,
    metrics: Arc<UpstreamMetrics>,
}

impl ListingAggregator {
    /// Creates an aggregator with the default upstream concurrency bound
    pub fn new(
        listings: Arc<dyn ListingsProvider>,
        directory: Arc<dyn CoinDirectoryProvider>,
        prices: Arc<dyn PriceProvider>,
    ) -> Self {
        Self::with_upstream_limit(listings, directory, prices, MAX_CONCURRENT_UPSTREAM)
    }

    /// Creates an aggregator allowing at most `max_concurrent` upstream calls in flight
    pub fn with_upstream_limit(
        listings: Arc<dyn ListingsProvider>,
        directory: Arc<dyn CoinDirectoryProvider>,
        prices: Arc<dyn PriceProvider>,
        max_concurrent: usize,
    ) -> Self {
        let metrics = Arc::new(UpstreamMetrics::new([
            listings.provider_name(),
            directory.provider_name(),
            prices.provider_name(),
        ]));

        Self {
            listings,
            directory,
            prices,
            upstream_permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            metrics,
        }
    }

    /// Validates raw query values and runs the pipeline
    ///
    /// Invalid input is rejected before any provider is called.
    pub async fn aggregate(&self, limit: &str, order: &str) -> Result<AggregateResult, AggregateError> {
        let query = ListingQuery::parse(limit, order)?;
        self.aggregate_query(query).await
    }

    /// Runs the pipeline for an already validated query
    pub async fn aggregate_query(&self, query: ListingQuery) -> Result<AggregateResult, AggregateError> {
        let span = tracing::info_span!(
            "aggregate",
            request_id = %Uuid::new_v4(),
            limit = query.limit(),
            sort = %query.sort(),
        );
        self.run(query).instrument(span).await
    }

    async fn run(&self, query: ListingQuery) -> Result<AggregateResult, AggregateError> {
        let start = Instant::now();

        let (listings, directory) = tokio::try_join!(
            self.call(self.listings.provider_name(), self.listings.fetch_listings(&query)),
            self.call(self.directory.provider_name(), self.directory.fetch_coin_directory()),
        )?;

        let primary = listings.primary().ok_or_else(|| {
            tracing::error!(provider = self.listings.provider_name(), "Listings response was empty");
            AggregateError::EmptyListings
        })?;
        let coin_id = resolve_coin_id(&primary.name, &directory);
        tracing::debug!(listing = %primary.name, coin_id = %coin_id, "Resolved comparison coin");
        drop(directory);

        let prices: Arc<[f64]> = usd_prices(&listings, self.listings.provider_name())?.into();

        let (comparison_price, statistics) = tokio::try_join!(
            self.fetch_comparison_price(&coin_id),
            compute_statistics(prices),
        )?;

        tracing::info!(
            listings = listings.len(),
            coin_id = %coin_id,
            comparison_price = %comparison_price,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Aggregation complete"
        );

        Ok(AggregateResult {
            listings,
            statistics,
            comparison_coin_id: coin_id,
            comparison_price,
        })
    }

    async fn fetch_comparison_price(&self, coin_id: &str) -> Result<ComparisonPrice, AggregateError> {
        let price = self
            .call(self.prices.provider_name(), self.prices.fetch_price(coin_id))
            .await?;
        Ok(ComparisonPrice::from(price))
    }

    /// Runs one upstream request under the concurrency bound, recording metrics
    async fn call<T, F>(&self, provider: &'static str, request: F) -> Result<T, AggregateError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let _permit = self
            .upstream_permits
            .acquire()
            .await
            .map_err(|_| AggregateError::internal("upstream semaphore closed"))?;

        let start = Instant::now();
        let result = request.await;
        let elapsed = start.elapsed();
        self.metrics.record(provider, elapsed, result.is_ok()).await;

        result.map_err(|e| {
            tracing::error!(
                provider,
                status = ?e.status(),
                latency_ms = elapsed.as_millis() as u64,
                error = %e,
                "Upstream request failed"
            );
            AggregateError::from_provider(provider, e)
        })
    }

    /// Per-provider latency and success metrics
    pub async fn provider_metrics(&self) -> Vec<ProviderMetrics> {
        self.metrics.snapshot().await
    }

    /// Perform a health check on the upstream dependencies
    ///
    /// # Returns
    /// ComponentHealth derived from the recorded success rate of every
    /// provider that has seen traffic
    pub async fn health_check(&self) -> ComponentHealth {
        let providers = self.provider_metrics().await;
        let active: Vec<&ProviderMetrics> =
            providers.iter().filter(|m| m.total_requests > 0).collect();

        let failing: Vec<&str> = active
            .iter()
            .filter(|m| m.success_rate == 0.0)
            .map(|m| m.provider_name.as_str())
            .collect();
        let degraded: Vec<&str> = active
            .iter()
            .filter(|m| m.success_rate < HEALTHY_SUCCESS_RATE)
            .map(|m| m.provider_name.as_str())
            .collect();

        let (status, message) = if !failing.is_empty() {
            (
                HealthStatus::Unhealthy,
                format!("Upstream failing every request: {}", failing.join(", ")),
            )
        } else if !degraded.is_empty() {
            (
                HealthStatus::Degraded,
                format!("Upstream success rate below threshold: {}", degraded.join(", ")),
            )
        } else {
            (
                HealthStatus::Healthy,
                "All upstream providers are answering".to_string(),
            )
        };

        let mut details = std::collections::HashMap::new();
        details.insert("providers".to_string(), serde_json::json!(providers));
        details.insert(
            "upstream_permits_available".to_string(),
            serde_json::json!(self.upstream_permits.available_permits()),
        );

        ComponentHealth {
            name: "listing_aggregator".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}
