//! Relay session lifecycle states.
//!
//! ```text
//! INIT ──open──▶ UPSTREAM_CONNECTING ──ready──▶ UPSTREAM_READY
//!   │                    │                            │
//!   └────────────────────┴──────────close─────────────┴──▶ CLOSED
//! ```
//!
//! The pending queue lives inside the `UpstreamConnecting` variant, so a
//! session can only stage frames while the handshake is running and can only
//! forward directly once it is ready.

use std::fmt;
use std::time::Duration;

use super::queue::PendingQueue;

/// Observable lifecycle phase of a session, without the attached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Init,
    UpstreamConnecting,
    UpstreamReady,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Init => write!(f, "INIT"),
            SessionPhase::UpstreamConnecting => write!(f, "UPSTREAM_CONNECTING"),
            SessionPhase::UpstreamReady => write!(f, "UPSTREAM_READY"),
            SessionPhase::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Lifecycle state of a session together with the data owned by that state.
#[derive(Debug)]
pub enum SessionState {
    /// Client accepted, upstream not opened yet
    Init,
    /// Upstream handshake in flight; client frames are staged
    UpstreamConnecting { pending: PendingQueue },
    /// Upstream open; frames flow directly in both directions
    UpstreamReady,
    /// Terminal
    Closed { reason: CloseReason },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Init => SessionPhase::Init,
            SessionState::UpstreamConnecting { .. } => SessionPhase::UpstreamConnecting,
            SessionState::UpstreamReady => SessionPhase::UpstreamReady,
            SessionState::Closed { .. } => SessionPhase::Closed,
        }
    }
}

/// Why a session reached `CLOSED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a close frame or disconnected
    ClientClosed,
    /// Reading from the client failed
    ClientError(String),
    /// The upstream sent a close frame or disconnected
    UpstreamClosed,
    /// Reading from or writing to the upstream failed
    UpstreamError(String),
    /// The upstream could not be opened at all (server configuration)
    UpstreamUnavailable(String),
    /// The upstream handshake failed
    UpstreamConnectFailed(String),
    /// The upstream handshake did not finish in time
    HandshakeTimeout(Duration),
    /// The pending queue filled up under the `close` overflow policy
    QueueOverflow,
    /// A lifecycle invariant was violated
    Internal(String),
}

impl CloseReason {
    /// Whether the close was caused by a failure rather than a peer hanging up.
    pub fn is_error(&self) -> bool {
        !matches!(self, CloseReason::ClientClosed | CloseReason::UpstreamClosed)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClientClosed => write!(f, "client closed"),
            CloseReason::ClientError(e) => write!(f, "client error: {e}"),
            CloseReason::UpstreamClosed => write!(f, "upstream closed"),
            CloseReason::UpstreamError(e) => write!(f, "upstream error: {e}"),
            CloseReason::UpstreamUnavailable(e) => write!(f, "upstream unavailable: {e}"),
            CloseReason::UpstreamConnectFailed(e) => write!(f, "upstream connect failed: {e}"),
            CloseReason::HandshakeTimeout(timeout) => {
                write!(f, "upstream handshake timed out after {}s", timeout.as_secs())
            }
            CloseReason::QueueOverflow => write!(f, "pending queue overflow"),
            CloseReason::Internal(e) => write!(f, "internal error: {e}"),
        }
    }
}
