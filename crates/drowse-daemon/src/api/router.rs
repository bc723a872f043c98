//! API router configuration.

use super::auth::require_api_key;
use super::handlers;
use super::state::AppState;
use crate::error::ApiError;
use axum::{
    http::Uri,
    middleware,
    routing::{get, post},
    Router,
};
use drowse_types::Role;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router.
///
/// Routes are gated by role at construction: a sleeper never exposes the
/// waker surface and vice versa. `/` and `/health` are the only
/// unauthenticated routes.
pub fn create_router(state: AppState) -> Router {
    let open_routes = Router::new()
        .route("/", get(handlers::welcome))
        .route("/health", get(handlers::health_check));

    let role_routes = match state.role() {
        Role::Waker => Router::new()
            .route("/waker/status", get(handlers::waker_status))
            .route("/waker/wake", get(handlers::wake))
            .route("/waker/suspend", get(handlers::waker_suspend))
            .route("/waker/heartbeat", post(handlers::heartbeat))
            .route("/waker/config", get(handlers::waker_config)),
        Role::Sleeper => Router::new()
            .route("/sleeper/status", get(handlers::sleeper_status))
            .route("/sleeper/suspend", get(handlers::sleeper_suspend))
            .route("/sleeper/config", get(handlers::sleeper_config)),
    };

    let role_routes = role_routes.route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_api_key,
    ));

    let router = open_routes
        .merge(role_routes)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http());

    let router = if state.config.server.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

/// Unmatched paths (including the inactive role's routes) still answer
/// with the stable error body.
async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaemonConfig;
    use crate::exec::EtherWake;
    use crate::orchestrator::{Orchestrator, SharedMachine};
    use crate::peer::PeerClient;
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Method, Request, StatusCode};
    use drowse_core::{StateMachine, SystemClock, TimingParams};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    fn waker_config() -> DaemonConfig {
        let mut config = DaemonConfig::default();
        config.node.api_key = "secret".to_string();
        config.node.waker.name = "tower".to_string();
        config.node.sleeper.name = "vault".to_string();
        config.node.sleeper.mac_address = "aa:bb:cc:dd:ee:ff".to_string();
        config
    }

    fn waker_app() -> (Router, SharedMachine) {
        let config = Arc::new(waker_config());
        let machine: SharedMachine =
            Arc::new(Mutex::new(StateMachine::new(TimingParams::default())));
        let peer = Arc::new(
            PeerClient::new(
                config.peer_base_url(),
                config.node.api_key.clone(),
                Duration::from_millis(100),
            )
            .unwrap(),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            machine.clone(),
            Arc::new(SystemClock),
            Arc::new(EtherWake::new("/nonexistent/etherwake", Duration::from_secs(5))),
            peer,
            config.node.sleeper.mac_address.clone(),
            config.shared_checksum(),
        ));
        let state = AppState::new(config, Some(orchestrator), None);
        (create_router(state), machine)
    }

    fn sleeper_app() -> Router {
        let mut config = waker_config();
        config.node.role = drowse_types::Role::Sleeper;
        let state = AppState::new(
            Arc::new(config),
            None,
            Some(Arc::new(crate::exec::Systemctl::new(
                "/bin/echo",
                "suspend",
                "running",
                Duration::from_secs(5),
            ))),
        );
        create_router(state)
    }

    fn get_request(path: &str, api_key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(key) = api_key {
            builder = builder.header("X-Api-Key", key);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn open_routes_need_no_key() {
        let (app, _) = waker_app();
        let response = app
            .clone()
            .oneshot(get_request("/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get_request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_key_is_unauthorized() {
        let (app, _) = waker_app();
        let response = app
            .oneshot(get_request("/waker/status", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_key_is_unauthorized_with_stable_body() {
        let (app, _) = waker_app();
        let response = app
            .oneshot(get_request("/waker/status", Some("nope")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["type"], "Unauthorized");
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn status_reports_the_machine_state() {
        let (app, machine) = waker_app();
        machine.lock().await.heartbeat_received(chrono::Utc::now());

        let response = app
            .oneshot(get_request("/waker/status", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["op"], "status");
        assert_eq!(body["state"], "ON");
    }

    #[tokio::test]
    async fn heartbeat_post_feeds_the_machine() {
        let (app, machine) = waker_app();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/waker/heartbeat")
            .header("X-Api-Key", "secret")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"hostname":"vault"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            machine.lock().await.state(),
            drowse_types::ReachabilityState::On
        );
    }

    #[tokio::test]
    async fn roles_do_not_expose_each_other() {
        let (waker, _) = waker_app();
        let response = waker
            .oneshot(get_request("/sleeper/status", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let sleeper = sleeper_app();
        let response = sleeper
            .oneshot(get_request("/waker/status", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_routes_get_the_stable_error_body() {
        let (app, _) = waker_app();
        let response = app
            .oneshot(get_request("/sleeper/status", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["type"], "NotFound");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("/sleeper/status"));
    }

    #[tokio::test]
    async fn sleeper_status_runs_the_status_command() {
        let app = sleeper_app();
        let response = app
            .oneshot(get_request("/sleeper/status", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["op"], "status");
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn config_endpoint_redacts_the_key() {
        let (app, _) = waker_app();
        let response = app
            .oneshot(get_request("/waker/config", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["node"]["api_key"], "***hidden***");
    }
}
