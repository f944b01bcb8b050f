//! Instance lifecycle and the host-facing plugin contract.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use serde::Serialize;

use crate::config::{InstanceConfig, SecretStore};
use crate::error::RelayResult;
use crate::proxy::{build_router, AppState, FleetClient};

/// Narrow contract the host drives an instance through: resource dispatch,
/// health checks, teardown. Keeping the engine behind this trait keeps it
/// host-agnostic and testable without the host present.
pub trait PluginInstance: Send + Sync {
    /// Router the host dispatches resource calls into. Cheap to call; the
    /// router is built once at construction and cloned here.
    fn resource_router(&self) -> Router;

    /// Liveness of this component, independent of upstream reachability.
    fn check_health(&self) -> HealthCheckResult;

    /// Releases held resources. Nothing beyond what the host already manages
    /// exists here, but the entry point is part of the lifecycle contract.
    fn dispose(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
}

/// One configured relay instance.
///
/// Construction parses the settings eagerly and fails fast on a malformed
/// document; after that everything is immutable, so the host may dispatch
/// resource calls concurrently without any coordination.
pub struct FleetRelay {
    config: Arc<InstanceConfig>,
    router: Router,
}

impl FleetRelay {
    /// Creates an instance from the host's raw settings JSON and its
    /// decrypted-secrets map.
    pub fn new(raw_settings: &[u8], decrypted_secrets: HashMap<String, String>) -> RelayResult<Self> {
        let config = Arc::new(InstanceConfig::from_raw(raw_settings)?);
        let secrets = Arc::new(SecretStore::new(decrypted_secrets));
        let upstream = Arc::new(FleetClient::new()?);

        tracing::info!(
            datasource_uid = %config.datasource_uid,
            "fleet relay instance created"
        );

        let router = build_router(AppState {
            config: Arc::clone(&config),
            secrets,
            upstream,
        });

        Ok(Self { config, router })
    }

    /// The datasource this instance is bound to.
    pub fn datasource_uid(&self) -> &str {
        &self.config.datasource_uid
    }
}

impl PluginInstance for FleetRelay {
    fn resource_router(&self) -> Router {
        self.router.clone()
    }

    fn check_health(&self) -> HealthCheckResult {
        // Static on purpose: a transient upstream outage must not make the
        // relay itself report unhealthy.
        HealthCheckResult {
            status: HealthStatus::Ok,
            message: "ok".to_owned(),
        }
    }

    fn dispose(&mut self) {
        tracing::debug!(
            datasource_uid = %self.config.datasource_uid,
            "fleet relay instance disposed"
        );
    }
}
