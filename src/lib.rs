//! Resource router and credential-injecting relay for a collector fleet API.
//!
//! The host application constructs a [`FleetRelay`] from its raw instance
//! settings and decrypted secrets, then drives it through the
//! [`PluginInstance`] contract: resource calls are dispatched into the
//! router returned by [`PluginInstance::resource_router`], health checks go
//! to [`PluginInstance::check_health`], and teardown to
//! [`PluginInstance::dispose`]. Everything network-facing (listener, TLS,
//! secret decryption) belongs to the host; this crate only routes, injects
//! the pre-issued credential, and relays upstream responses verbatim.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;

pub use app::{FleetRelay, HealthCheckResult, HealthStatus, PluginInstance};
pub use config::{InstanceConfig, ProxyUpstream, SecretStore};
pub use error::RelayError;
