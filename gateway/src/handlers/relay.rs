//! Relay WebSocket handler
//!
//! Upgrades `GET /ws`, runs the access gate and hands accepted connections to
//! a [`RelaySession`]. Rejected connections get a single JSON error frame
//! followed by a policy-violation close; no upstream connection is attempted.

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::Extensions,
    response::Response,
};
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::core::relay::{RelaySession, Transport};
use crate::errors::AuthError;
use crate::middleware::ClientIp;
use crate::state::{AppState, ConnectionSlot};

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Query parameters accepted on the relay endpoint
#[derive(Debug, Default, Deserialize)]
pub struct AccessQuery {
    #[serde(default)]
    pub password: Option<String>,
}

/// Relay WebSocket handler
///
/// The credential is checked before the upgrade, but its outcome is delivered
/// over the socket so the client can read the rejection reason.
pub async fn relay_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccessQuery>,
    extensions: Extensions,
) -> Response {
    let client_ip = extensions.get::<ClientIp>().map(|ip| ip.0);
    let slot = extensions.get::<ConnectionSlot>().cloned();
    drop(extensions);

    debug!(remote_addr = ?client_ip, "Relay WebSocket upgrade requested");

    let access = state.access_gate.check(query.password.as_deref());

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move {
            match access {
                Ok(_) => handle_relay_socket(socket, state, client_ip).await,
                Err(error) => reject_socket(socket, error).await,
            }
            drop(slot);
        })
}

/// Run a relay session for an accepted client.
async fn handle_relay_socket(socket: WebSocket, state: Arc<AppState>, client_ip: Option<IpAddr>) {
    let session = RelaySession::new(state.relay_settings.clone());
    let span = info_span!(
        "relay_session",
        session_id = %session.id(),
        remote_addr = ?client_ip,
    );

    async move {
        info!("Relay WebSocket connection established");
        session
            .run(Transport::from_client_socket(socket), state.connector.as_ref())
            .await;
    }
    .instrument(span)
    .await
}

/// Send the rejection payload, then close with a policy violation.
async fn reject_socket(mut socket: WebSocket, error: AuthError) {
    let payload = match serde_json::to_string(&error.rejection_payload()) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to serialize rejection payload");
            return;
        }
    };

    if let Err(e) = socket.send(Message::Text(payload.into())).await {
        debug!(error = %e, "Client went away before rejection was sent");
        return;
    }

    let close = CloseFrame {
        code: close_code::POLICY,
        reason: error.to_string().into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(close))).await {
        debug!(error = %e, "Failed to send close frame after rejection");
    }
}
