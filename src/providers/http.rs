//! Request plumbing shared by the HTTP providers

use crate::{constants::USER_AGENT, error::ProviderError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds a client with a bounded per-request timeout
pub(crate) fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::NetworkError)
}

/// Sends `request` and decodes a JSON body, mapping every failure onto [`ProviderError`]
pub(crate) async fn get_json<T: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(ProviderError::from_transport)?;

    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimitExceeded);
    }

    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(provider, status = status.as_u16(), body = %body, "Upstream returned non-OK status");
        return Err(ProviderError::ApiError {
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(ProviderError::from_transport)?;

    decode(provider, &body)
}

/// Decodes a response body, keeping the body itself out of the error message
pub(crate) fn decode<T: DeserializeOwned>(provider: &'static str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::debug!(provider, body = %body, "Undecodable upstream body");
        ProviderError::InvalidResponse(format!("Failed to parse {} response: {}", provider, e))
    })
}

/// Serves `router` on an ephemeral local port and returns its base URL
#[cfg(test)]
pub(crate) async fn spawn_test_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CoinDirectoryEntry;

    #[test]
    fn test_decode_reports_invalid_json() {
        let err = decode::<Vec<CoinDirectoryEntry>>("coingecko", "{not json").unwrap_err();
        match err {
            ProviderError::InvalidResponse(msg) => {
                assert!(msg.contains("coingecko"));
                assert!(!msg.contains("{not json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_reports_wrong_shape() {
        let err = decode::<Vec<CoinDirectoryEntry>>("coingecko", r#"{"status":"ok"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    async fn fetch(url: String) -> Result<Vec<CoinDirectoryEntry>, ProviderError> {
        let client = build_client(Duration::from_secs(5)).unwrap();
        get_json("coingecko-coins-list", client.get(url)).await
    }

    #[tokio::test]
    async fn test_get_json_maps_http_status() {
        use axum::{http::StatusCode as Code, routing::get};

        let base = spawn_test_server(
            axum::Router::new()
                .route("/ok", get(|| async { r#"[{"id":"bitcoin","symbol":"btc","name":"Bitcoin"}]"# }))
                .route("/limited", get(|| async { (Code::TOO_MANY_REQUESTS, "slow down") }))
                .route("/broken", get(|| async { (Code::INTERNAL_SERVER_ERROR, "oops") }))
                .route("/garbage", get(|| async { "<html>maintenance</html>" })),
        )
        .await;

        let entries = fetch(format!("{base}/ok")).await.unwrap();
        assert_eq!(entries[0].id, "bitcoin");

        assert!(matches!(
            fetch(format!("{base}/limited")).await,
            Err(ProviderError::RateLimitExceeded)
        ));
        assert!(matches!(
            fetch(format!("{base}/broken")).await,
            Err(ProviderError::ApiError { status: 500 })
        ));
        assert!(matches!(
            fetch(format!("{base}/missing")).await,
            Err(ProviderError::ApiError { status: 404 })
        ));
        assert!(matches!(
            fetch(format!("{base}/garbage")).await,
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(1)).is_ok());
    }
}
