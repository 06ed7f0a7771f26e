//! Types for the listing aggregator

use crate::{constants::MAX_LISTINGS_LIMIT, error::AggregateError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Treats an explicit JSON `null` like a missing number
fn nullable_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Field the listings provider sorts by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "market_cap")]
    MarketCap,
    #[serde(rename = "volume_24h")]
    Volume24h,
    #[serde(rename = "percent_change_1h")]
    PercentChange1h,
    #[serde(rename = "percent_change_24h")]
    PercentChange24h,
    #[serde(rename = "percent_change_7d")]
    PercentChange7d,
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "symbol")]
    Symbol,
}

impl SortOrder {
    /// Wire value sent as the `sort` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::MarketCap => "market_cap",
            SortOrder::Volume24h => "volume_24h",
            SortOrder::PercentChange1h => "percent_change_1h",
            SortOrder::PercentChange24h => "percent_change_24h",
            SortOrder::PercentChange7d => "percent_change_7d",
            SortOrder::Price => "price",
            SortOrder::Name => "name",
            SortOrder::Symbol => "symbol",
        }
    }

    /// Get all accepted sort orders
    pub fn all() -> &'static [SortOrder] {
        &[
            SortOrder::MarketCap,
            SortOrder::Volume24h,
            SortOrder::PercentChange1h,
            SortOrder::PercentChange24h,
            SortOrder::PercentChange7d,
            SortOrder::Price,
            SortOrder::Name,
            SortOrder::Symbol,
        ]
    }
}

impl FromStr for SortOrder {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::all()
            .iter()
            .find(|order| order.as_str() == s)
            .copied()
            .ok_or_else(|| AggregateError::validation(format!("unsupported order '{}'", s)))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated listings request
///
/// Only [`ListingQuery::parse`] and [`ListingQuery::new`] build one, so holding a
/// value means `limit` and `sort` were already checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingQuery {
    limit: u32,
    sort: SortOrder,
}

impl ListingQuery {
    /// Creates a query from typed values, checking the limit range
    pub fn new(limit: u32, sort: SortOrder) -> Result<Self, AggregateError> {
        if limit == 0 || limit > MAX_LISTINGS_LIMIT {
            return Err(AggregateError::validation(format!(
                "limit must be between 1 and {}",
                MAX_LISTINGS_LIMIT
            )));
        }
        Ok(Self { limit, sort })
    }

    /// Parses raw query-string values
    pub fn parse(limit: &str, order: &str) -> Result<Self, AggregateError> {
        let limit: u32 = limit.trim().parse().map_err(|_| {
            AggregateError::validation(format!("limit must be a positive integer, got '{}'", limit))
        })?;
        let sort = order.trim().parse()?;
        Self::new(limit, sort)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }
}

/// Status envelope returned with every listings response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub elapsed: u64,
    #[serde(default)]
    pub credit_count: u64,
    #[serde(default)]
    pub notice: Option<String>,
}

/// Parent chain of a token listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub token_address: String,
}

/// Price and market metrics of a listing in one currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub volume_24h: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub volume_change_24h: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub percent_change_1h: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub percent_change_24h: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub percent_change_7d: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub market_cap: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub market_cap_dominance: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub fully_diluted_market_cap: f64,
    pub last_updated: DateTime<Utc>,
}

/// One ranked asset from the listings provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub slug: String,
    pub cmc_rank: u32,
    #[serde(default)]
    pub num_market_pairs: u32,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub circulating_supply: f64,
    #[serde(default, deserialize_with = "nullable_f64")]
    pub total_supply: f64,
    #[serde(default)]
    pub max_supply: Option<f64>,
    #[serde(default)]
    pub infinite_supply: Option<bool>,
    pub last_updated: DateTime<Utc>,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub self_reported_circulating_supply: Option<f64>,
    #[serde(default)]
    pub self_reported_market_cap: Option<f64>,
    pub quote: HashMap<String, Quote>,
}

impl Listing {
    /// Quote in the given currency code
    pub fn quote_in(&self, currency: &str) -> Option<&Quote> {
        self.quote.get(currency)
    }
}

/// Listings response: ordered listings plus the provider status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSet {
    pub data: Vec<Listing>,
    pub status: Status,
}

impl ListingSet {
    /// The top-ranked listing in provider order
    pub fn primary(&self) -> Option<&Listing> {
        self.data.first()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Entry of the second provider's coin directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinDirectoryEntry {
    pub id: String,
    pub name: String,
    pub symbol: String,
}

/// Summary statistics over listing USD prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStatistics {
    pub average: f64,
    pub median: f64,
    pub standard_deviation: f64,
    pub max: f64,
    pub min: f64,
}

/// Price of the primary listing on the comparison provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "usd", rename_all = "snake_case")]
pub enum ComparisonPrice {
    Available(f64),
    NotAvailable,
}

impl From<Option<f64>> for ComparisonPrice {
    fn from(price: Option<f64>) -> Self {
        price.map_or(ComparisonPrice::NotAvailable, ComparisonPrice::Available)
    }
}

impl fmt::Display for ComparisonPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonPrice::Available(price) => write!(f, "${:.2}", price),
            ComparisonPrice::NotAvailable => f.write_str("not available"),
        }
    }
}

/// Everything handed to the presentation layer for one request
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub listings: ListingSet,
    pub statistics: PriceStatistics,
    /// Identifier used for the comparison lookup
    pub comparison_coin_id: String,
    pub comparison_price: ComparisonPrice,
}

/// Overall system health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Every upstream is answering
    Healthy,
    /// Some upstream calls are failing
    Degraded,
    /// At least one upstream fails every call
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_query() {
        let query = ListingQuery::parse("25", "volume_24h").unwrap();
        assert_eq!(query.limit(), 25);
        assert_eq!(query.sort(), SortOrder::Volume24h);
    }

    #[test]
    fn test_parse_rejects_non_positive_limit() {
        for limit in ["0", "-5", "abc", "", "1.5"] {
            let err = ListingQuery::parse(limit, "price").unwrap_err();
            assert!(matches!(err, AggregateError::Validation(_)), "limit {limit:?}");
        }
    }

    #[test]
    fn test_parse_rejects_limit_above_provider_max() {
        let err = ListingQuery::parse("5001", "price").unwrap_err();
        assert!(matches!(err, AggregateError::Validation(_)));
        assert!(ListingQuery::parse("5000", "price").is_ok());
    }

    #[test]
    fn test_parse_rejects_unknown_order() {
        let err = ListingQuery::parse("10", "circulating_supply").unwrap_err();
        assert!(matches!(err, AggregateError::Validation(_)));
    }

    #[test]
    fn test_sort_order_round_trips_through_wire_name() {
        for order in SortOrder::all() {
            assert_eq!(order.as_str().parse::<SortOrder>().unwrap(), *order);
        }
    }

    #[test]
    fn test_comparison_price_display() {
        assert_eq!(ComparisonPrice::Available(50.0).to_string(), "$50.00");
        assert_eq!(ComparisonPrice::Available(1234.567).to_string(), "$1234.57");
        assert_eq!(ComparisonPrice::NotAvailable.to_string(), "not available");
        assert_eq!(ComparisonPrice::from(None), ComparisonPrice::NotAvailable);
    }

    #[test]
    fn test_listing_set_deserializes_provider_payload() {
        let json = r#"{
            "status": {
                "timestamp": "2024-05-01T12:00:00.000Z",
                "error_code": 0,
                "error_message": null,
                "elapsed": 12,
                "credit_count": 1,
                "notice": null
            },
            "data": [{
                "id": 1027,
                "name": "Ethereum",
                "symbol": "ETH",
                "slug": "ethereum",
                "cmc_rank": 2,
                "num_market_pairs": 9000,
                "circulating_supply": 120000000,
                "total_supply": 120000000,
                "max_supply": null,
                "infinite_supply": true,
                "last_updated": "2024-05-01T11:59:00.000Z",
                "date_added": "2015-08-07T00:00:00.000Z",
                "tags": ["pos", "smart-contracts"],
                "platform": null,
                "self_reported_circulating_supply": null,
                "self_reported_market_cap": null,
                "quote": {
                    "USD": {
                        "price": 3000.5,
                        "volume_24h": 1.0e10,
                        "volume_change_24h": -3.2,
                        "percent_change_1h": 0.1,
                        "percent_change_24h": 1.2,
                        "percent_change_7d": -4.0,
                        "market_cap": 3.6e11,
                        "market_cap_dominance": 16.5,
                        "fully_diluted_market_cap": null,
                        "last_updated": "2024-05-01T11:59:00.000Z"
                    }
                }
            }]
        }"#;

        let set: ListingSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 1);
        let eth = set.primary().unwrap();
        assert_eq!(eth.name, "Ethereum");
        assert!(eth.max_supply.is_none());
        assert!(eth.platform.is_none());
        let usd = eth.quote_in("USD").unwrap();
        assert_eq!(usd.price, 3000.5);
        assert_eq!(usd.fully_diluted_market_cap, 0.0);
    }

    #[test]
    fn test_listing_with_platform_deserializes() {
        let json = r#"{
            "id": 3408,
            "name": "USDC",
            "symbol": "USDC",
            "cmc_rank": 6,
            "circulating_supply": 3.2e10,
            "total_supply": 3.2e10,
            "last_updated": "2024-05-01T11:59:00.000Z",
            "date_added": "2018-10-08T00:00:00.000Z",
            "platform": {
                "id": 1027,
                "name": "Ethereum",
                "symbol": "ETH",
                "slug": "ethereum",
                "token_address": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
            },
            "self_reported_market_cap": 3.2e10,
            "quote": {}
        }"#;

        let listing: Listing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.platform.as_ref().unwrap().id, 1027);
        assert_eq!(listing.self_reported_market_cap, Some(3.2e10));
        assert!(listing.quote_in("USD").is_none());
    }
}
