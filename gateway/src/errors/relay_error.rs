use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::core::relay::SessionPhase;

/// Errors raised while opening or driving a relay session.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The server has no credential for the upstream service
    #[error("Upstream API key is not configured")]
    MissingUpstreamCredential,

    /// The configured upstream endpoint cannot be used
    #[error("Invalid upstream URL: {0}")]
    InvalidUpstreamUrl(String),

    /// The upstream WebSocket handshake failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Transport error on an established connection
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// A lifecycle event arrived in a state that does not accept it
    #[error("Invalid session transition: {event} while {from}")]
    InvalidTransition {
        from: SessionPhase,
        event: &'static str,
    },
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

impl From<axum::Error> for RelayError {
    fn from(err: axum::Error) -> Self {
        RelayError::WebSocketError(err.to_string())
    }
}

impl From<tungstenite::Error> for RelayError {
    fn from(err: tungstenite::Error) -> Self {
        RelayError::WebSocketError(err.to_string())
    }
}
