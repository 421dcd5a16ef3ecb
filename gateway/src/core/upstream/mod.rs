//! Upstream connectors.
//!
//! An [`UpstreamConnector`] knows how to reach the generative-AI streaming
//! service on behalf of a relay session. Opening is split in two steps so the
//! session can tell a synchronous configuration failure (no credential,
//! unusable endpoint) apart from a failed or slow handshake.

mod gemini;

pub use gemini::{GEMINI_LIVE_URL, GeminiLiveConnector, build_upstream_url};

use futures::future::BoxFuture;

use crate::core::relay::Transport;
use crate::errors::RelayResult;

/// Handshake in flight; resolves once the upstream connection is open.
pub type PendingUpstream = BoxFuture<'static, RelayResult<Transport>>;

/// Opens upstream connections for relay sessions.
pub trait UpstreamConnector: Send + Sync {
    /// Start opening a connection.
    ///
    /// An `Err` here is a synchronous failure and is fatal to the session.
    /// The returned future performs the actual handshake.
    fn open(&self) -> RelayResult<PendingUpstream>;

    /// Name used in log fields.
    fn name(&self) -> &str {
        "upstream"
    }
}
