//! Bidirectional streaming relay with connect-time buffering.
//!
//! A [`RelaySession`] owns one accepted client connection and lazily opens
//! one upstream connection on its behalf. Client frames that arrive before the
//! upstream handshake finishes are staged in a [`PendingQueue`] and flushed in
//! arrival order; afterwards frames flow directly in both directions until
//! either side closes, which closes the other.
//!
//! # Example
//!
//! ```rust,ignore
//! use live_relay::core::relay::{RelaySession, RelaySettings, Transport};
//!
//! let session = RelaySession::new(RelaySettings::default());
//! let summary = session
//!     .run(Transport::from_client_socket(socket), connector.as_ref())
//!     .await;
//! println!("closed: {}", summary.reason);
//! ```

mod frame;
mod lifecycle;
mod queue;
mod session;
mod transport;

pub use frame::Frame;
pub use lifecycle::{CloseReason, SessionPhase, SessionState};
pub use queue::{DEFAULT_PENDING_CAPACITY, Enqueue, OverflowPolicy, PendingQueue};
pub use session::{
    Admission, DEFAULT_CONNECT_TIMEOUT, RelaySession, RelaySettings, SessionStats, SessionSummary,
};
pub use transport::{FrameSink, FrameStream, Transport};
