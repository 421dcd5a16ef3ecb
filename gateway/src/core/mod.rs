//! Core relay functionality.
//!
//! - [`access`] - shared-secret access gate
//! - [`relay`] - per-connection relay session and its state machine
//! - [`upstream`] - connectors for the generative-AI streaming service

pub mod access;
pub mod relay;
pub mod upstream;

pub use access::{AccessGate, AccessGrant};
pub use relay::{
    CloseReason, Frame, OverflowPolicy, RelaySession, RelaySettings, SessionPhase, SessionSummary,
    Transport,
};
pub use upstream::{GEMINI_LIVE_URL, GeminiLiveConnector, PendingUpstream, UpstreamConnector};
