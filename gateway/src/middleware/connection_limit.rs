//! Connection limit middleware for WebSocket connections
//!
//! This module provides middleware to enforce connection limits:
//! - Global maximum WebSocket connections
//! - Per-IP connection limits
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use live_relay::middleware::connection_limit_middleware;
//!
//! let app = Router::new()
//!     .route("/ws", get(relay_handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         connection_limit_middleware,
//!     ));
//! ```

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::state::{AppState, ConnectionLimitError};

/// Client IP carried through to the handler for log fields.
#[derive(Clone, Copy, Debug)]
pub struct ClientIp(pub IpAddr);

/// Middleware that enforces connection limits for WebSocket connections.
///
/// This middleware:
/// 1. Returns 503 Service Unavailable if the global limit is reached
/// 2. Returns 429 Too Many Requests if the per-IP limit is reached
/// 3. Otherwise injects `ClientIp` and the reserved `ConnectionSlot`
///
/// The slot travels with the request. If the upgrade fails it is dropped with
/// the request; otherwise the handler moves it into the socket task and the
/// reservation lasts until the session ends.
///
/// Only WebSocket upgrade requests (detected by the Upgrade header) are
/// counted. Other requests pass through without limit checks.
pub async fn connection_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let is_ws_upgrade = request
        .headers()
        .get("upgrade")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    if !is_ws_upgrade {
        return next.run(request).await;
    }

    let client_ip = addr.ip();

    match state.try_acquire_connection(client_ip) {
        Ok(slot) => {
            request.extensions_mut().insert(ClientIp(client_ip));
            request.extensions_mut().insert(slot);
            next.run(request).await
        }
        Err(ConnectionLimitError::GlobalLimitReached) => {
            tracing::warn!(
                ip = %client_ip,
                "Rejecting connection: global limit reached"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server at capacity. Please try again later.",
            )
                .into_response()
        }
        Err(ConnectionLimitError::PerIpLimitReached) => {
            tracing::warn!(
                ip = %client_ip,
                "Rejecting connection: per-IP limit reached"
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many connections from your IP address.",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, extract::connect_info::MockConnectInfo, middleware, routing::get};
    use std::net::Ipv4Addr;
    use tower::ServiceExt;

    use crate::config::ServerConfig;

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/ws", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                connection_limit_middleware,
            ))
            .with_state(state)
            .layer(MockConnectInfo(SocketAddr::from((
                Ipv4Addr::new(10, 0, 0, 1),
                4000,
            ))))
    }

    fn upgrade_request() -> Request<Body> {
        Request::builder()
            .uri("/ws")
            .header("upgrade", "websocket")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_plain_request_is_not_counted() {
        let mut config = ServerConfig::default();
        config.max_websocket_connections = Some(1);
        let state = AppState::new(config);

        let _held = state
            .try_acquire_connection(Ipv4Addr::new(10, 0, 0, 2).into())
            .unwrap();

        let response = app(state)
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_global_limit_returns_503() {
        let mut config = ServerConfig::default();
        config.max_websocket_connections = Some(1);
        let state = AppState::new(config);

        let _held = state
            .try_acquire_connection(Ipv4Addr::new(10, 0, 0, 2).into())
            .unwrap();

        let response = app(state).oneshot(upgrade_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_per_ip_limit_returns_429() {
        let mut config = ServerConfig::default();
        config.max_connections_per_ip = 1;
        let state = AppState::new(config);

        let _held = state
            .try_acquire_connection(Ipv4Addr::new(10, 0, 0, 1).into())
            .unwrap();

        let response = app(state).oneshot(upgrade_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_slot_released_after_request() {
        let state = AppState::new(ServerConfig::default());

        let response = app(state.clone()).oneshot(upgrade_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.ws_connection_count(), 0);
    }
}
