//! Route registration for the resource surface.
//!
//! The route set is closed: four exact routes plus one prefix-matched entry.
//! Exact routes win over the prefix by construction, because the prefix lives
//! in the router's fallback and only runs when nothing else matched.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{InstanceConfig, SecretStore};
use crate::proxy::handlers;
use crate::proxy::upstream::FleetClient;

/// Per-instance state shared by every handler. Everything is immutable after
/// construction, so concurrent resource calls need no locking.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<InstanceConfig>,
    pub secrets: Arc<SecretStore>,
    pub upstream: Arc<FleetClient>,
}

/// Builds the resource router the host dispatches into.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/echo", post(handlers::echo))
        .route(
            "/fleet-management-api/ListCollectors",
            post(handlers::list_collectors),
        )
        .route(
            "/fleet-management-api/GetConfig",
            post(handlers::get_config),
        )
        .fallback(handlers::generic_proxy)
        // No inbound size cap at this layer; bodies are relayed verbatim.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn test_router(settings: Value, secrets: &[(&str, &str)]) -> Router {
        let config = InstanceConfig::from_raw(settings.to_string().as_bytes()).unwrap();
        let secrets = SecretStore::new(
            secrets
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        build_router(AppState {
            config: Arc::new(config),
            secrets: Arc::new(secrets),
            upstream: Arc::new(FleetClient::new().unwrap()),
        })
    }

    /// Router with no usable upstream: any outbound attempt would fail, so
    /// these tests double as "no outbound call was made" checks for paths
    /// that must short-circuit locally.
    fn local_router() -> Router {
        test_router(json!({}), &[])
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn ping_returns_ok_message() {
        let response = local_router()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "message": "ok" }));
    }

    #[tokio::test]
    async fn ping_rejects_post() {
        let response = local_router()
            .oneshot(Request::post("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn echo_round_trips_message() {
        let response = local_router()
            .oneshot(
                Request::post("/echo")
                    .body(Body::from(r#"{"message":"hello there"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "message": "hello there" }));
    }

    #[tokio::test]
    async fn echo_treats_absent_and_null_message_as_empty() {
        for body in ["{}", r#"{"message":null}"#] {
            let response = local_router()
                .oneshot(Request::post("/echo").body(Body::from(body)).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "body: {body:?}");
            assert_eq!(body_json(response).await, json!({ "message": "" }), "body: {body:?}");
        }
    }

    #[tokio::test]
    async fn echo_rejects_get_with_405() {
        let response = local_router()
            .oneshot(Request::get("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn echo_rejects_invalid_json_with_400() {
        for body in ["not json at all", r#"{"message": 42}"#, ""] {
            let response = local_router()
                .oneshot(Request::post("/echo").body(Body::from(body)).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body:?}");
        }
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let response = local_router()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generic_route_with_empty_action_is_400() {
        for path in ["/proxy-fleet", "/proxy-fleet/"] {
            let response = local_router()
                .oneshot(Request::post(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "path: {path}");
        }
    }

    #[tokio::test]
    async fn generic_route_rejects_get() {
        let response = local_router()
            .oneshot(Request::get("/proxy-fleet/Foo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn proxied_routes_short_circuit_without_credentials() {
        // No base URL and no token configured: every proxied path must fail
        // with a client error before attempting the network.
        for path in [
            "/fleet-management-api/ListCollectors",
            "/fleet-management-api/GetConfig",
            "/proxy-fleet/ListCollectors",
        ] {
            let response = local_router()
                .oneshot(Request::post(path).body(Body::from("{}")).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "path: {path}");
        }
    }

    #[tokio::test]
    async fn missing_token_alone_also_short_circuits() {
        let router = test_router(json!({ "fleetBaseURL": "https://fleet.example.net" }), &[]);
        let response = router
            .oneshot(
                Request::post("/fleet-management-api/GetConfig")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
