// proxy module - resource routing and the fleet API relay

pub mod handlers;
pub mod routes;
pub mod upstream;

pub use routes::{build_router, AppState};
pub use upstream::{FleetClient, ProxiedResponse};
