//! Environment-driven server configuration

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use crate::{
    constants::{
        COIN_LIST_URL, LISTEN_ADDR, LISTINGS_URL, MAX_CONCURRENT_UPSTREAM, RATE_LIMIT_BURST,
        RATE_LIMIT_PER_SECOND, REQUEST_TIMEOUT_SECS, SIMPLE_PRICE_URL,
    },
    error::ConfigError,
    rate_limiter::RateLimitConfig,
};

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Shared secret callers pass as `api-key`
    pub api_key: String,
    pub cmc_api_key: String,
    pub coingecko_api_key: String,
    pub listings_url: String,
    pub coin_list_url: String,
    pub simple_price_url: String,
    pub upstream_timeout: Duration,
    pub max_concurrent_upstream: usize,
    pub rate_limit: RateLimitConfig,
    /// Rate-limit by `X-Forwarded-For` (only behind a proxy that sets it)
    pub trust_forwarded_for: bool,
    pub static_dir: Option<PathBuf>,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Parses a finite float no smaller than `min` (or strictly above it when `exclusive`)
fn bounded_f64(
    name: &'static str,
    default: f64,
    min: f64,
    exclusive: bool,
) -> Result<f64, ConfigError> {
    let value = parsed(name, default)?;
    let in_range = value.is_finite() && if exclusive { value > min } else { value >= min };
    if in_range {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}

impl Config {
    /// Loads `.env` (if present) and reads the configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let listen_addr = parsed(
            "LISTEN_ADDR",
            LISTEN_ADDR.parse().map_err(|_| ConfigError::Invalid {
                name: "LISTEN_ADDR",
                value: LISTEN_ADDR.to_string(),
            })?,
        )?;

        let max_clients = match optional("RATE_LIMIT_MAX_CLIENTS") {
            Some(value) => Some(value.trim().parse::<usize>().map_err(|_| ConfigError::Invalid {
                name: "RATE_LIMIT_MAX_CLIENTS",
                value,
            })?),
            None => None,
        };

        Ok(Self {
            listen_addr,
            api_key: required("API_KEY")?,
            cmc_api_key: required("CMC_API_KEY")?,
            coingecko_api_key: required("COINGECKO_API_KEY")?,
            listings_url: optional("LISTINGS_URL").unwrap_or_else(|| LISTINGS_URL.to_string()),
            coin_list_url: optional("COIN_LIST_URL").unwrap_or_else(|| COIN_LIST_URL.to_string()),
            simple_price_url: optional("SIMPLE_PRICE_URL")
                .unwrap_or_else(|| SIMPLE_PRICE_URL.to_string()),
            upstream_timeout: Duration::from_secs(parsed(
                "UPSTREAM_TIMEOUT_SECS",
                REQUEST_TIMEOUT_SECS,
            )?),
            max_concurrent_upstream: parsed("MAX_CONCURRENT_UPSTREAM", MAX_CONCURRENT_UPSTREAM)?,
            rate_limit: RateLimitConfig {
                refill_per_second: bounded_f64(
                    "RATE_LIMIT_PER_SECOND",
                    RATE_LIMIT_PER_SECOND,
                    0.0,
                    true,
                )?,
                burst_capacity: bounded_f64("RATE_LIMIT_BURST", RATE_LIMIT_BURST, 1.0, false)?,
                max_clients,
            },
            trust_forwarded_for: parsed("TRUST_FORWARDED_FOR", false)?,
            static_dir: optional("STATIC_DIR").map(PathBuf::from),
        })
    }
}
