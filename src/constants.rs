//! Constants for the listing aggregator
//!
//! Defaults for everything [`crate::config::Config`] can override from the
//! environment, plus the fixed protocol values of the upstream APIs.

/// CoinMarketCap listings endpoint
pub const LISTINGS_URL: &str = "https://pro-api.coinmarketcap.com/v1/cryptocurrency/listings/latest";

/// CoinGecko full coin directory endpoint
pub const COIN_LIST_URL: &str = "https://api.coingecko.com/api/v3/coins/list";

/// CoinGecko simple price endpoint
pub const SIMPLE_PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Credential header expected by CoinMarketCap
pub const CMC_API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Credential header expected by the CoinGecko demo API
pub const COINGECKO_API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Currency code every listing must be quoted in
pub const USD: &str = "USD";

/// Currency key used by the CoinGecko price map
pub const COINGECKO_VS_CURRENCY: &str = "usd";

/// Largest `limit` the listings endpoint accepts
pub const MAX_LISTINGS_LIMIT: u32 = 5000;

/// HTTP request timeout for upstream calls (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum number of upstream requests in flight across the process
pub const MAX_CONCURRENT_UPSTREAM: usize = 16;

/// Tokens added to a client bucket per second
pub const RATE_LIMIT_PER_SECOND: f64 = 1.0;

/// Maximum tokens a client bucket holds
pub const RATE_LIMIT_BURST: f64 = 10.0;

/// Default listen address
pub const LISTEN_ADDR: &str = "0.0.0.0:8080";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "listing-aggregator/0.1.0";
