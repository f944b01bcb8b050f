//! Instance configuration and per-request credential resolution.
//!
//! The host hands over two documents at instance creation: the non-secret
//! settings JSON (parsed into [`InstanceConfig`]) and the decrypted-secrets
//! map (wrapped in [`SecretStore`]). Both are immutable for the instance
//! lifetime. Credentials are resolved from them just-in-time on every proxied
//! call, never cached, so a host that rotates secrets between instances gets
//! consistent behavior.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

/// Secret name under which the host stores the pre-formed Basic credential
/// for the configured fleet API.
pub const FLEET_AUTH_TOKEN_KEY: &str = "fleetAuthToken";

/// Non-secret instance settings, parsed once from the host's JSON document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    /// Base URL of the fleet API, e.g.
    /// `https://fleet.example.net/collector.v1.CollectorService`.
    /// May be empty: that is a call-time `MissingCredentials`, not a parse
    /// error, so a half-configured instance can still serve `/ping`.
    #[serde(default, rename = "fleetBaseURL")]
    pub fleet_base_url: String,

    /// Opaque reference to the datasource this instance is bound to.
    #[serde(default)]
    pub datasource_uid: String,

    /// Which upstream the generic `/proxy-fleet/*` route targets.
    #[serde(default)]
    pub proxy_upstream: ProxyUpstream,
}

impl InstanceConfig {
    /// Parses the raw settings document and fail-fast validates every base
    /// URL that is present.
    pub fn from_raw(raw: &[u8]) -> RelayResult<Self> {
        let config: InstanceConfig =
            serde_json::from_slice(raw).map_err(RelayError::ConfigParse)?;
        validate_base_url(&config.fleet_base_url)?;
        if let ProxyUpstream::Dedicated { base_url, .. } = &config.proxy_upstream {
            validate_base_url(base_url)?;
        }
        Ok(config)
    }
}

/// Upstream selection policy for the generic proxy route.
///
/// The named routes always use the instance's configured fleet API. The
/// generic route may instead be pointed at a dedicated collector endpoint;
/// that endpoint's credential lives in the secret store under `token_secret`,
/// so no credential ever appears in non-secret settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ProxyUpstream {
    /// Reuse `fleetBaseURL` + `fleetAuthToken` (the default).
    #[default]
    Configured,
    /// Separate collector endpoint with its own secret.
    #[serde(rename_all = "camelCase")]
    Dedicated {
        #[serde(rename = "baseURL")]
        base_url: String,
        token_secret: String,
    },
}

/// Read-only view of the host's decrypted secrets.
///
/// Values are wrapped in [`SecretString`] the moment they enter this type, so
/// they are redacted from `Debug` output and zeroized on drop. Nothing in
/// this crate logs or echoes a secret value.
pub struct SecretStore {
    secrets: HashMap<String, SecretString>,
}

impl SecretStore {
    pub fn new(decrypted: HashMap<String, String>) -> Self {
        let secrets = decrypted
            .into_iter()
            .map(|(name, value)| (name, SecretString::new(value)))
            .collect();
        Self { secrets }
    }

    pub fn get(&self, name: &str) -> Option<&SecretString> {
        self.secrets.get(name)
    }
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("entries", &self.secrets.len())
            .finish_non_exhaustive()
    }
}

/// Resolved upstream target for one proxied call.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Base URL with any trailing slashes trimmed, so the forwarder's join
    /// always yields exactly one separator.
    pub base_url: String,
    pub token: SecretString,
}

/// Resolves the upstream target just-in-time for one call.
///
/// Both the base URL and the named secret must be present and non-empty;
/// otherwise this returns [`RelayError::MissingCredentials`] and the caller
/// must not attempt any outbound request.
pub fn resolve(
    base_url: &str,
    secret_name: &str,
    secrets: &SecretStore,
) -> RelayResult<Credentials> {
    if base_url.is_empty() {
        return Err(RelayError::MissingCredentials);
    }
    let token = secrets
        .get(secret_name)
        .filter(|token| !token.expose_secret().is_empty())
        .ok_or(RelayError::MissingCredentials)?;
    Ok(Credentials {
        base_url: base_url.trim_end_matches('/').to_owned(),
        token: token.clone(),
    })
}

fn validate_base_url(base_url: &str) -> RelayResult<()> {
    if base_url.is_empty() {
        return Ok(());
    }
    url::Url::parse(base_url).map_err(|source| RelayError::InvalidBaseUrl {
        url: base_url.to_owned(),
        source,
    })?;
    Ok(())
}
