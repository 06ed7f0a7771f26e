//! # Listing Aggregator
//!
//! HTTP service that combines cryptocurrency listings from CoinMarketCap with a
//! comparison price from CoinGecko, plus summary statistics over the listing
//! prices, and renders the result as HTML.
//!
//! ## Usage
//!
//! The pipeline can be driven without the HTTP layer:
//!
//! ```no_run
//! use std::sync::Arc;
//! use listing_aggregator::{CoinGeckoProvider, CoinMarketCapProvider, ListingAggregator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coingecko = Arc::new(CoinGeckoProvider::new("cg-key")?);
//! let aggregator = ListingAggregator::new(
//!     Arc::new(CoinMarketCapProvider::new("cmc-key")?),
//!     coingecko.clone(),
//!     coingecko,
//! );
//!
//! let result = aggregator.aggregate("10", "market_cap").await?;
//! println!("median: ${:.2}", result.statistics.median);
//! println!("comparison: {}", result.comparison_price);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! # use listing_aggregator::{AggregateError, ListingAggregator};
//! # async fn example(aggregator: ListingAggregator) {
//! match aggregator.aggregate("0", "price").await {
//!     Ok(result) => println!("{} listings", result.listings.len()),
//!     Err(AggregateError::Validation(msg)) => println!("bad request: {}", msg),
//!     Err(AggregateError::Upstream { provider, source }) => {
//!         eprintln!("{} failed: {}", provider, source)
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

pub mod aggregator;
pub mod api;
pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod rate_limiter;
pub mod render;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use aggregator::{resolve_coin_id, ListingAggregator};
pub use error::{AggregateError, ConfigError, ProviderError, StatsError};
pub use metrics::ProviderMetrics;
pub use provider::{CoinDirectoryProvider, ListingsProvider, PriceProvider};
pub use providers::{CoinGeckoProvider, CoinMarketCapProvider};
pub use rate_limiter::{RateLimitConfig, RateLimiterRegistry};
pub use types::{
    AggregateResult, CoinDirectoryEntry, ComparisonPrice, ComponentHealth, HealthStatus, Listing,
    ListingQuery, ListingSet, PriceStatistics, Quote, SortOrder,
};
