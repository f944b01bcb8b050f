//! Outbound client for the fleet API.
//!
//! One pooled [`reqwest::Client`] per instance; every proxied call goes
//! through [`FleetClient::forward`], which injects the pre-issued credential
//! and hands the upstream response back untouched. No retries: the upstream
//! operations are not known to be idempotent, so a failed attempt surfaces
//! immediately instead of risking duplicate side effects.

use bytes::Bytes;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use tokio::time::Duration;

use crate::config::Credentials;
use crate::error::{RelayError, RelayResult};

/// Upstream response relayed verbatim to the caller.
///
/// Only the status and body survive the hop; the relay stamps
/// `Content-Type: application/json` on everything it returns.
#[derive(Debug)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

pub struct FleetClient {
    http_client: Client,
}

impl FleetClient {
    pub fn new() -> RelayResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(RelayError::HttpClient)?;
        Ok(Self { http_client })
    }

    /// Joins base URL and action with exactly one separating slash.
    ///
    /// `Credentials::base_url` arrives with trailing slashes already trimmed;
    /// the action side is trimmed here so callers cannot produce `//`.
    fn build_url(base_url: &str, action: &str) -> String {
        format!("{}/{}", base_url, action.trim_start_matches('/'))
    }

    /// Issues one authenticated POST and buffers the full response.
    ///
    /// The inbound body is forwarded verbatim. Exactly two headers are set:
    /// `Authorization: Basic <token>` (the token is already in wire form and
    /// is not re-encoded) and `Content-Type: application/json`. The future is
    /// only polled from the inbound handler, so a caller disconnect drops it
    /// and aborts the outbound request with it.
    ///
    /// Upstream 4xx/5xx are not errors here; any reachable upstream response
    /// becomes a [`ProxiedResponse`]. Only failing to reach the upstream or
    /// to read its body maps to a [`RelayError`].
    pub async fn forward(
        &self,
        credentials: &Credentials,
        action: &str,
        body: Bytes,
    ) -> RelayResult<ProxiedResponse> {
        let url = Self::build_url(&credentials.base_url, action);

        let authorization =
            HeaderValue::from_str(&format!("Basic {}", credentials.token.expose_secret()))
                .map_err(RelayError::RequestBuild)?;

        tracing::debug!(%url, action, "forwarding to fleet API");

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await
            .map_err(RelayError::UpstreamUnreachable)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(RelayError::UpstreamBodyRead)?;

        tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), "fleet API responded");

        Ok(ProxiedResponse { status, body })
    }
}
