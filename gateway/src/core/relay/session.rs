//! Relay session: one client leg, one upstream leg.
//!
//! [`RelaySession::run`] drives the whole lifecycle:
//!
//! 1. Open the upstream through the configured [`UpstreamConnector`]. A
//!    synchronous failure closes the client right away.
//! 2. While the handshake is in flight, stage client frames in the pending
//!    queue (bounded by the handshake timeout).
//! 3. On upstream open, flush the staged frames in arrival order, then pump
//!    both directions concurrently until one of them ends.
//! 4. Close both legs.
//!
//! The synchronous transition methods ([`RelaySession::begin_connecting`],
//! [`RelaySession::admit`], [`RelaySession::upstream_ready`],
//! [`RelaySession::close`]) are public so the state machine can be exercised
//! without any I/O.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::frame::Frame;
use super::lifecycle::{CloseReason, SessionPhase, SessionState};
use super::queue::{DEFAULT_PENDING_CAPACITY, Enqueue, OverflowPolicy, PendingQueue};
use super::transport::{FrameSink, FrameStream, Transport};
use crate::core::upstream::UpstreamConnector;
use crate::errors::{RelayError, RelayResult};

/// Default bound on the upstream handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound on sending a close frame during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-session tunables, derived from the server configuration.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Maximum staged frames while connecting (0 = unbounded)
    pub pending_capacity: usize,
    /// Behavior when the pending queue is full
    pub overflow_policy: OverflowPolicy,
    /// Maximum time spent in `UPSTREAM_CONNECTING`
    pub connect_timeout: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Decision taken for a frame received from the client.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// Staged in the pending queue
    Queued,
    /// Upstream is ready; send the frame now
    Forward(Frame),
    /// Discarded (queue full, or session not accepting frames)
    Dropped(Frame),
    /// Queue full under the `close` policy; the session must end
    Overflow,
}

/// Frame counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames written to the upstream, flushed backlog included
    pub frames_to_upstream: u64,
    /// Frames written to the client
    pub frames_to_client: u64,
    /// Client frames discarded before reaching the upstream
    pub frames_dropped: u64,
    /// Number of staged frames flushed when the upstream became ready
    pub backlog_flushed: usize,
}

/// Final report of a finished session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub reason: CloseReason,
    pub stats: SessionStats,
    pub duration: Duration,
}

/// Per-connection relay state.
#[derive(Debug)]
pub struct RelaySession {
    id: Uuid,
    state: SessionState,
    settings: RelaySettings,
    stats: SessionStats,
}

impl RelaySession {
    pub fn new(settings: RelaySettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Init,
            settings,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Number of staged frames. Always zero outside `UPSTREAM_CONNECTING`.
    pub fn pending_len(&self) -> usize {
        match &self.state {
            SessionState::UpstreamConnecting { pending } => pending.len(),
            _ => 0,
        }
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        match &self.state {
            SessionState::Closed { reason } => Some(reason),
            _ => None,
        }
    }

    /// `INIT` → `UPSTREAM_CONNECTING`.
    pub fn begin_connecting(&mut self) -> RelayResult<()> {
        match self.state {
            SessionState::Init => {
                self.state = SessionState::UpstreamConnecting {
                    pending: PendingQueue::new(
                        self.settings.pending_capacity,
                        self.settings.overflow_policy,
                    ),
                };
                Ok(())
            }
            _ => Err(RelayError::InvalidTransition {
                from: self.phase(),
                event: "begin_connecting",
            }),
        }
    }

    /// Decide what happens to a frame received from the client.
    pub fn admit(&mut self, frame: Frame) -> Admission {
        match &mut self.state {
            SessionState::UpstreamReady => Admission::Forward(frame),
            SessionState::UpstreamConnecting { pending } => match pending.push(frame) {
                Enqueue::Accepted => Admission::Queued,
                Enqueue::Displaced(evicted) => {
                    self.stats.frames_dropped += 1;
                    warn!(
                        session_id = %self.id,
                        kind = evicted.kind(),
                        evicted_bytes = evicted.len(),
                        buffered_bytes = pending.buffered_bytes(),
                        "Pending queue full, evicted oldest frame"
                    );
                    Admission::Queued
                }
                Enqueue::Rejected(frame) => {
                    self.stats.frames_dropped += 1;
                    warn!(
                        session_id = %self.id,
                        kind = frame.kind(),
                        frame_bytes = frame.len(),
                        buffered_bytes = pending.buffered_bytes(),
                        "Pending queue full, dropped incoming frame"
                    );
                    Admission::Dropped(frame)
                }
                Enqueue::Overflow => {
                    self.stats.frames_dropped += 1;
                    warn!(
                        session_id = %self.id,
                        capacity = pending.capacity().unwrap_or(0),
                        buffered_bytes = pending.buffered_bytes(),
                        "Pending queue overflow, closing session"
                    );
                    Admission::Overflow
                }
            },
            SessionState::Init | SessionState::Closed { .. } => {
                self.stats.frames_dropped += 1;
                Admission::Dropped(frame)
            }
        }
    }

    /// `UPSTREAM_CONNECTING` → `UPSTREAM_READY`.
    ///
    /// Returns the staged frames in arrival order. The queue itself is gone
    /// afterwards.
    pub fn upstream_ready(&mut self) -> RelayResult<VecDeque<Frame>> {
        match std::mem::replace(&mut self.state, SessionState::UpstreamReady) {
            SessionState::UpstreamConnecting { pending } => Ok(pending.into_frames()),
            previous => {
                let from = previous.phase();
                self.state = previous;
                Err(RelayError::InvalidTransition {
                    from,
                    event: "upstream_ready",
                })
            }
        }
    }

    /// Any state → `CLOSED`. Staged frames are discarded. The first reason wins.
    pub fn close(&mut self, reason: CloseReason) {
        if let SessionState::Closed { .. } = self.state {
            return;
        }
        if let SessionState::UpstreamConnecting { pending } = &self.state {
            self.stats.frames_dropped += pending.len() as u64;
        }
        self.state = SessionState::Closed { reason };
    }

    /// Run the session to completion over the given client leg.
    pub async fn run(
        mut self,
        client: Transport,
        connector: &dyn UpstreamConnector,
    ) -> SessionSummary {
        let started = Instant::now();
        let (mut client_sink, mut client_stream) = client.into_parts();

        let reason = self
            .drive(&mut client_sink, &mut client_stream, connector)
            .await;

        close_quietly(&mut client_sink).await;
        drop(client_stream);
        self.close(reason);

        let summary = SessionSummary {
            session_id: self.id,
            reason: self
                .close_reason()
                .cloned()
                .unwrap_or(CloseReason::ClientClosed),
            stats: self.stats,
            duration: started.elapsed(),
        };

        if summary.reason.is_error() {
            warn!(
                session_id = %summary.session_id,
                reason = %summary.reason,
                frames_to_upstream = summary.stats.frames_to_upstream,
                frames_to_client = summary.stats.frames_to_client,
                frames_dropped = summary.stats.frames_dropped,
                duration_ms = summary.duration.as_millis() as u64,
                "Relay session closed"
            );
        } else {
            info!(
                session_id = %summary.session_id,
                reason = %summary.reason,
                frames_to_upstream = summary.stats.frames_to_upstream,
                frames_to_client = summary.stats.frames_to_client,
                frames_dropped = summary.stats.frames_dropped,
                duration_ms = summary.duration.as_millis() as u64,
                "Relay session closed"
            );
        }

        summary
    }

    async fn drive(
        &mut self,
        client_sink: &mut FrameSink,
        client_stream: &mut FrameStream,
        connector: &dyn UpstreamConnector,
    ) -> CloseReason {
        let pending_upstream = match connector.open() {
            Ok(pending) => pending,
            Err(e) => {
                error!(
                    session_id = %self.id,
                    upstream = connector.name(),
                    error = %e,
                    "Cannot open upstream connection"
                );
                return CloseReason::UpstreamUnavailable(e.to_string());
            }
        };

        if let Err(e) = self.begin_connecting() {
            return CloseReason::Internal(e.to_string());
        }

        debug!(
            session_id = %self.id,
            upstream = connector.name(),
            "Connecting to upstream"
        );

        let connect_timeout = self.settings.connect_timeout;
        let connect = tokio::time::timeout(connect_timeout, pending_upstream);
        tokio::pin!(connect);

        let upstream = loop {
            tokio::select! {
                biased;

                result = &mut connect => match result {
                    Ok(Ok(upstream)) => break upstream,
                    Ok(Err(e)) => {
                        error!(session_id = %self.id, error = %e, "Upstream connection failed");
                        return CloseReason::UpstreamConnectFailed(e.to_string());
                    }
                    Err(_) => {
                        error!(
                            session_id = %self.id,
                            timeout_secs = connect_timeout.as_secs(),
                            "Upstream handshake timed out"
                        );
                        return CloseReason::HandshakeTimeout(connect_timeout);
                    }
                },

                next = client_stream.next() => match next {
                    Some(Ok(frame)) => match self.admit(frame) {
                        Admission::Queued | Admission::Dropped(_) => {}
                        Admission::Overflow => return CloseReason::QueueOverflow,
                        Admission::Forward(_) => {
                            return CloseReason::Internal(
                                "frame forwarded before upstream was ready".to_string(),
                            );
                        }
                    },
                    Some(Err(e)) => return CloseReason::ClientError(e.to_string()),
                    None => {
                        debug!(session_id = %self.id, "Client left during upstream handshake");
                        return CloseReason::ClientClosed;
                    }
                },
            }
        };

        let (mut upstream_sink, mut upstream_stream) = upstream.into_parts();

        let backlog = match self.upstream_ready() {
            Ok(backlog) => backlog,
            Err(e) => return CloseReason::Internal(e.to_string()),
        };
        let backlog_len = backlog.len();

        for frame in backlog {
            if let Err(e) = upstream_sink.feed(frame).await {
                close_quietly(&mut upstream_sink).await;
                return CloseReason::UpstreamError(e.to_string());
            }
            self.stats.frames_to_upstream += 1;
        }
        if let Err(e) = upstream_sink.flush().await {
            close_quietly(&mut upstream_sink).await;
            return CloseReason::UpstreamError(e.to_string());
        }
        self.stats.backlog_flushed = backlog_len;

        info!(
            session_id = %self.id,
            upstream = connector.name(),
            backlog = backlog_len,
            "Upstream ready"
        );

        let mut delivered = 0u64;
        let reason = tokio::select! {
            reason = self.pump_client_frames(client_stream, &mut upstream_sink) => reason,
            reason = pump_upstream_frames(&mut upstream_stream, client_sink, &mut delivered) => reason,
        };
        self.stats.frames_to_client += delivered;

        close_quietly(&mut upstream_sink).await;
        reason
    }

    /// Client → upstream, once ready.
    async fn pump_client_frames(
        &mut self,
        client: &mut FrameStream,
        upstream: &mut FrameSink,
    ) -> CloseReason {
        while let Some(next) = client.next().await {
            let frame = match next {
                Ok(frame) => frame,
                Err(e) => return CloseReason::ClientError(e.to_string()),
            };

            match self.admit(frame) {
                Admission::Forward(frame) => {
                    if let Err(e) = upstream.send(frame).await {
                        return CloseReason::UpstreamError(e.to_string());
                    }
                    self.stats.frames_to_upstream += 1;
                }
                other => {
                    return CloseReason::Internal(format!(
                        "unexpected admission {other:?} while {}",
                        self.phase()
                    ));
                }
            }
        }
        CloseReason::ClientClosed
    }
}

/// Upstream → client. A frame that cannot be written means the client is
/// gone; it is dropped and the session ends.
async fn pump_upstream_frames(
    upstream: &mut FrameStream,
    client: &mut FrameSink,
    delivered: &mut u64,
) -> CloseReason {
    while let Some(next) = upstream.next().await {
        let frame = match next {
            Ok(frame) => frame,
            Err(e) => return CloseReason::UpstreamError(e.to_string()),
        };

        if let Err(e) = client.send(frame).await {
            debug!(error = %e, "Client no longer open, dropping upstream frame");
            return CloseReason::ClientClosed;
        }
        *delivered += 1;
    }
    CloseReason::UpstreamClosed
}

async fn close_quietly(sink: &mut FrameSink) {
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "Error while closing connection"),
        Err(_) => debug!("Timed out while closing connection"),
    }
}
