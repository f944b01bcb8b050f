//! Resource handlers: the two fixed local actions and the proxied ones.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{self, Credentials, ProxyUpstream, FLEET_AUTH_TOKEN_KEY};
use crate::error::RelayError;
use crate::proxy::routes::AppState;
use crate::proxy::upstream::ProxiedResponse;

/// `GET /ping`: liveness of the resource surface, never touches upstream.
pub async fn ping() -> Response {
    Json(json!({ "message": "ok" })).into_response()
}

#[derive(Debug, Deserialize, Serialize)]
struct EchoBody {
    /// Absent and `null` both decode to the empty string; only malformed
    /// JSON or a non-string value is a 400.
    #[serde(default, deserialize_with = "message_or_empty")]
    message: String,
}

fn message_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let message: Option<String> = Option::deserialize(deserializer)?;
    Ok(message.unwrap_or_default())
}

/// `POST /echo`: decodes `{"message": string}` and re-encodes it.
///
/// Decoding is done from the raw bytes rather than an extractor so that any
/// undecodable body is a plain 400, per the resource contract.
pub async fn echo(request: Request) -> Response {
    let bytes = match read_body(request.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => return err.into_response(),
    };
    match serde_json::from_slice::<EchoBody>(&bytes) {
        Ok(body) => Json(body).into_response(),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid JSON body" })),
        )
            .into_response(),
    }
}

/// `POST /fleet-management-api/ListCollectors`.
///
/// The upstream action is a registration-time literal; caller input cannot
/// influence it.
pub async fn list_collectors(State(state): State<AppState>, request: Request) -> Response {
    proxy_fleet_post(&state, request, "ListCollectors").await
}

/// `POST /fleet-management-api/GetConfig`.
pub async fn get_config(State(state): State<AppState>, request: Request) -> Response {
    proxy_fleet_post(&state, request, "GetConfig").await
}

/// Prefix under which the generic proxy action lives.
pub const GENERIC_PROXY_PREFIX: &str = "/proxy-fleet";

/// Router fallback: the one prefix-matched entry in the routing table.
///
/// Runs only after every exact route has been tried, which pins the
/// exact-before-prefix precedence. Anything outside the prefix is an explicit
/// 404; the router never falls through silently.
pub async fn generic_proxy(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_owned();
    let Some(remainder) = strip_generic_prefix(&path) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "not found" })),
        )
            .into_response();
    };

    if request.method() != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": "method not allowed" })),
        )
            .into_response();
    }

    let action = remainder.trim_start_matches('/').to_owned();
    if action.is_empty() {
        // Never issue an upstream call with an empty action segment.
        return RelayError::MissingAction.into_response();
    }

    let credentials = match generic_credentials(&state) {
        Ok(credentials) => credentials,
        Err(err) => return err.into_response(),
    };
    forward_and_relay(&state, request, &credentials, &action).await
}

/// Shared path for the named proxy routes: resolve credentials just-in-time,
/// then forward. A missing base URL or token short-circuits before any
/// outbound work.
async fn proxy_fleet_post(state: &AppState, request: Request, action: &str) -> Response {
    let credentials = match named_credentials(state) {
        Ok(credentials) => credentials,
        Err(err) => return err.into_response(),
    };
    forward_and_relay(state, request, &credentials, action).await
}

async fn forward_and_relay(
    state: &AppState,
    request: Request,
    credentials: &Credentials,
    action: &str,
) -> Response {
    let body = match read_body(request.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => return err.into_response(),
    };
    match state.upstream.forward(credentials, action, body).await {
        Ok(proxied) => relay(proxied),
        Err(err) => err.into_response(),
    }
}

/// Credentials for the named routes: always the configured fleet API.
fn named_credentials(state: &AppState) -> Result<Credentials, RelayError> {
    config::resolve(
        &state.config.fleet_base_url,
        FLEET_AUTH_TOKEN_KEY,
        &state.secrets,
    )
}

/// Credentials for the generic route, per the instance's upstream policy.
fn generic_credentials(state: &AppState) -> Result<Credentials, RelayError> {
    match &state.config.proxy_upstream {
        ProxyUpstream::Configured => named_credentials(state),
        ProxyUpstream::Dedicated {
            base_url,
            token_secret,
        } => config::resolve(base_url, token_secret, &state.secrets),
    }
}

/// Renders a passthrough: upstream status verbatim, body bytes unmodified,
/// content type pinned to JSON.
fn relay(proxied: ProxiedResponse) -> Response {
    (
        proxied.status,
        [(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"))],
        proxied.body,
    )
        .into_response()
}

async fn read_body(body: Body) -> Result<Bytes, RelayError> {
    // Unbounded on purpose: the host and upstream are trusted, and bodies
    // are relayed verbatim with no size cap at this layer.
    axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(RelayError::InboundBodyRead)
}

fn strip_generic_prefix(path: &str) -> Option<&str> {
    let remainder = path.strip_prefix(GENERIC_PROXY_PREFIX)?;
    // "/proxy-fleetFoo" is a different path, not a generic action.
    if remainder.is_empty() || remainder.starts_with('/') {
        Some(remainder)
    } else {
        None
    }
}
