use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong inside the relay.
///
/// Upstream 4xx/5xx responses are deliberately absent: those are relayed
/// verbatim as successful passthroughs, never converted into a variant here.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("failed to parse instance configuration: {0}")]
    ConfigParse(#[source] serde_json::Error),

    #[error("invalid fleet base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("fleet credentials not configured")]
    MissingCredentials,

    #[error("missing action")]
    MissingAction,

    #[error("failed to read request body")]
    InboundBodyRead(#[source] axum::Error),

    #[error("failed to create outbound request")]
    RequestBuild(#[source] reqwest::header::InvalidHeaderValue),

    #[error("fleet API request failed: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    #[error("failed to read fleet API response: {0}")]
    UpstreamBodyRead(#[source] reqwest::Error),
}

impl RelayError {
    /// HTTP status the caller sees for this failure.
    ///
    /// The two failure domains stay distinguishable: only
    /// `UpstreamUnreachable` maps to 502, so a passthrough 502 from the
    /// upstream never collides with "we could not reach the upstream at all"
    /// (passthroughs bypass this type entirely).
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingCredentials | RelayError::MissingAction => StatusCode::BAD_REQUEST,
            RelayError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            RelayError::ConfigParse(_)
            | RelayError::InvalidBaseUrl { .. }
            | RelayError::HttpClient(_)
            | RelayError::InboundBodyRead(_)
            | RelayError::RequestBuild(_)
            | RelayError::UpstreamBodyRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "relay error");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Alias used throughout the crate.
pub type RelayResult<T> = Result<T, RelayError>;
