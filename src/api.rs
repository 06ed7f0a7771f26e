//! HTTP routes, shared state and error responses

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::{request::Parts, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::{
    aggregator::ListingAggregator,
    error::AggregateError,
    rate_limiter::RateLimiterRegistry,
    render::{render_landing, render_result},
    types::ComponentHealth,
};

pub struct AppState {
    pub aggregator: ListingAggregator,
    pub rate_limiter: RateLimiterRegistry,
    /// Shared secret expected in the `api-key` query parameter
    pub api_key: String,
    /// Bucket clients by the first `X-Forwarded-For` hop instead of the peer address
    pub trust_forwarded_for: bool,
}

impl AppState {
    /// Compares the provided key without exiting early on the first differing byte
    fn api_key_matches(&self, provided: Option<&str>) -> bool {
        let Some(provided) = provided else {
            return false;
        };
        let (expected, provided) = (self.api_key.as_bytes(), provided.as_bytes());
        expected.len() == provided.len()
            && expected
                .iter()
                .zip(provided)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

/// Identifier the rate limiter buckets requests by
///
/// The peer address, or the first `X-Forwarded-For` hop when the server is
/// configured to sit behind a trusted proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl FromRequestParts<Arc<AppState>> for ClientId {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let forwarded = state
            .trust_forwarded_for
            .then(|| parts.headers.get("x-forwarded-for"))
            .flatten()
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let id = match forwarded {
            Some(ip) => ip.to_string(),
            None => parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        };
        Ok(ClientId(id))
    }
}

#[derive(Debug, Deserialize)]
pub struct ListingsParams {
    #[serde(rename = "api-key")]
    api_key: Option<String>,
    limit: Option<String>,
    order: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for AggregateError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.public_message(),
        });
        (status, body).into_response()
    }
}

async fn landing() -> Html<String> {
    Html(render_landing())
}

async fn get_listings(
    State(state): State<Arc<AppState>>,
    ClientId(client): ClientId,
    Query(params): Query<ListingsParams>,
) -> Result<Html<String>, AggregateError> {
    if !state.api_key_matches(params.api_key.as_deref()) {
        return Err(AggregateError::Unauthorized);
    }

    if !state.rate_limiter.allow(&client) {
        tracing::debug!(client = %client, "Client rate limited");
        return Err(AggregateError::RateLimited);
    }

    let result = state
        .aggregator
        .aggregate(
            params.limit.as_deref().unwrap_or_default(),
            params.order.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Html(render_result(&result)))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<ComponentHealth> {
    Json(state.aggregator.health_check().await)
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/api/get-listings", get(get_listings))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
