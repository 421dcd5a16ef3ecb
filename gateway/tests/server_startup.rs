//! Server Startup Tests
//!
//! Tests for application assembly and configuration-driven behavior of the
//! HTTP surface. These use `oneshot` against the router without binding a port.

use std::net::{Ipv4Addr, SocketAddr};

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use live_relay::{ServerConfig, routes, state::AppState};

fn create_minimal_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.port = 3001;
    config
}

fn app(config: ServerConfig) -> axum::Router {
    routes::create_app_router(AppState::new(config))
        .layer(MockConnectInfo(SocketAddr::from((Ipv4Addr::LOCALHOST, 5000))))
}

/// The server boots without an upstream API key or password
#[tokio::test]
async fn test_minimal_config_boot() {
    let app = app(create_minimal_config());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "OK");
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = app(create_minimal_config());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
}

/// A plain GET without upgrade headers is not a WebSocket request
#[tokio::test]
async fn test_relay_route_requires_upgrade() {
    let app = app(create_minimal_config());

    let request = Request::builder().uri("/ws").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_route_without_static_dir() {
    let app = app(create_minimal_config());

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_dir_is_served_as_fallback() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>live</h1>").unwrap();

    let mut config = create_minimal_config();
    config.static_dir = Some(dir.path().to_path_buf());
    let app = app(config);

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"<h1>live</h1>");
}

#[tokio::test]
async fn test_cors_wildcard_allows_any_origin() {
    let mut config = create_minimal_config();
    config.cors_allowed_origins = Some("*".to_string());
    let app = app(config);

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://ui.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_connection_limit_applies_to_relay_route() {
    let mut config = create_minimal_config();
    config.max_connections_per_ip = 1;
    let state = AppState::new(config);
    let _held = state
        .try_acquire_connection(Ipv4Addr::LOCALHOST.into())
        .unwrap();

    let app = routes::create_app_router(state)
        .layer(MockConnectInfo(SocketAddr::from((Ipv4Addr::LOCALHOST, 5000))));

    let request = Request::builder()
        .uri("/ws?password=x")
        .header("connection", "upgrade")
        .header("upgrade", "websocket")
        .header("sec-websocket-version", "13")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
