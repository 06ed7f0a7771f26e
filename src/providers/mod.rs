//! Upstream provider implementations

pub mod coingecko;
pub mod coinmarketcap;
mod http;

pub use coingecko::CoinGeckoProvider;
pub use coinmarketcap::CoinMarketCapProvider;
