//! Relay WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::relay::relay_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay WebSocket router
///
/// # Endpoint
///
/// `GET /ws?password=<secret>` - WebSocket upgrade for a relay session
///
/// # Protocol
///
/// Every text or binary frame is forwarded unmodified to the upstream service
/// and back. Frames sent before the upstream is ready are queued and delivered
/// in order. When a password is configured and the `password` parameter does
/// not match, the server sends `{"error":"Access denied"}` and closes with
/// code 1008.
///
/// Connection limits are layered on by `create_app_router` once state is available.
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
