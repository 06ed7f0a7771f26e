//! Process wiring: tracing setup and application state

use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    aggregator::ListingAggregator,
    api::AppState,
    config::Config,
    error::ProviderError,
    providers::{CoinGeckoProvider, CoinMarketCapProvider},
    rate_limiter::RateLimiterRegistry,
};

pub fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Builds the providers, aggregator and rate limiter from configuration
pub fn build_state(config: &Config) -> Result<Arc<AppState>, ProviderError> {
    let listings = Arc::new(CoinMarketCapProvider::with_endpoint(
        &config.listings_url,
        &config.cmc_api_key,
        config.upstream_timeout,
    )?);
    // One client serves both the directory and the price lookups
    let coingecko = Arc::new(CoinGeckoProvider::with_endpoints(
        &config.coin_list_url,
        &config.simple_price_url,
        &config.coingecko_api_key,
        config.upstream_timeout,
    )?);

    let aggregator = ListingAggregator::with_upstream_limit(
        listings,
        coingecko.clone(),
        coingecko,
        config.max_concurrent_upstream,
    );

    tracing::info!(
        listings_url = %config.listings_url,
        coin_list_url = %config.coin_list_url,
        max_concurrent_upstream = config.max_concurrent_upstream,
        burst = config.rate_limit.burst_capacity,
        refill_per_second = config.rate_limit.refill_per_second,
        "Listing aggregator configured"
    );

    Ok(Arc::new(AppState {
        aggregator,
        rate_limiter: RateLimiterRegistry::with_config(config.rate_limit.clone()),
        api_key: config.api_key.clone(),
        trust_forwarded_for: config.trust_forwarded_for,
    }))
}
