//! Error types for the listing aggregator

use thiserror::Error;

/// Errors that can occur when calling an upstream provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider (malformed or unexpected JSON)
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded on the provider side
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider answered with a non-success status
    #[error("Provider API error: HTTP {status}")]
    ApiError { status: u16 },

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

impl ProviderError {
    /// Classifies a reqwest failure, separating timeouts from other transport errors
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }

    /// Upstream status code, if the provider answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status } => Some(*status),
            Self::RateLimitExceeded => Some(429),
            Self::NetworkError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors from the statistics engine
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StatsError {
    /// Statistics are undefined over zero values
    #[error("Cannot compute statistics over an empty series")]
    EmptySeries,
}

/// Errors that end a single aggregation request
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Bad `limit` or `order` parameter
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Shared secret missing or wrong
    #[error("Invalid API key")]
    Unauthorized,

    /// Caller's token bucket is empty
    #[error("Too many requests")]
    RateLimited,

    /// Transport failure or non-success status from a dependency
    #[error("Upstream {provider} failed: {source}")]
    Upstream {
        provider: &'static str,
        #[source]
        source: ProviderError,
    },

    /// A dependency returned data that does not match its contract
    #[error("Upstream {provider} returned invalid data: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    /// The listings provider returned zero listings
    #[error("Upstream returned no listings")]
    EmptyListings,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AggregateError {
    /// Creates a Validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wraps a provider failure, keeping malformed payloads apart from transport failures
    pub fn from_provider(provider: &'static str, err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidResponse(message) => Self::Decode { provider, message },
            source => Self::Upstream { provider, source },
        }
    }

    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized => 401,
            Self::RateLimited => 429,
            Self::Upstream { .. } | Self::Decode { .. } | Self::EmptyListings | Self::Internal(_) => 500,
        }
    }

    /// Message safe to show to API callers
    ///
    /// Never includes upstream bodies, URLs or credentials.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Unauthorized => "Invalid API key".to_string(),
            Self::RateLimited => "Too many requests".to_string(),
            Self::Upstream { .. } => "Error fetching upstream data".to_string(),
            Self::Decode { .. } => "Error decoding upstream data".to_string(),
            Self::EmptyListings => "Upstream returned no listings".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<StatsError> for AggregateError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::EmptySeries => Self::EmptyListings,
        }
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variable is not set
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// Variable is set but cannot be parsed
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_response_maps_to_decode() {
        let err = AggregateError::from_provider(
            "coingecko",
            ProviderError::InvalidResponse("expected array".to_string()),
        );
        assert!(matches!(err, AggregateError::Decode { provider: "coingecko", .. }));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_status_error_maps_to_upstream() {
        let err = AggregateError::from_provider("coinmarketcap", ProviderError::ApiError { status: 503 });
        match &err {
            AggregateError::Upstream { provider, source } => {
                assert_eq!(*provider, "coinmarketcap");
                assert_eq!(source.status(), Some(503));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_public_message_hides_upstream_detail() {
        let err = AggregateError::Decode {
            provider: "coingecko",
            message: "body: {\"secret\":1}".to_string(),
        };
        assert!(!err.public_message().contains("secret"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AggregateError::validation("bad").status_code(), 400);
        assert_eq!(AggregateError::Unauthorized.status_code(), 401);
        assert_eq!(AggregateError::RateLimited.status_code(), 429);
        assert_eq!(AggregateError::from(StatsError::EmptySeries).status_code(), 500);
    }
}
