//! Process-wide application state.
//!
//! Holds the read-only configuration, the access gate, the upstream connector
//! and the connection-limit counters. Relay sessions never share anything
//! beyond this.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::config::ServerConfig;
use crate::core::access::AccessGate;
use crate::core::relay::RelaySettings;
use crate::core::upstream::{GeminiLiveConnector, UpstreamConnector};

/// Why a connection slot could not be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    /// `max_websocket_connections` reached
    GlobalLimitReached,
    /// `max_connections_per_ip` reached for this address
    PerIpLimitReached,
}

pub struct AppState {
    pub config: ServerConfig,
    pub access_gate: AccessGate,
    pub connector: Arc<dyn UpstreamConnector>,
    pub relay_settings: RelaySettings,

    ws_connections: AtomicUsize,
    connections_per_ip: DashMap<IpAddr, u32>,
}

impl AppState {
    /// Build state with the Gemini Live connector.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let connector = Arc::new(GeminiLiveConnector::from_config(&config));
        Self::with_connector(config, connector)
    }

    /// Build state with a custom upstream connector.
    pub fn with_connector(config: ServerConfig, connector: Arc<dyn UpstreamConnector>) -> Arc<Self> {
        let access_gate = AccessGate::new(config.access_password.clone());
        let relay_settings = config.relay_settings();

        Arc::new(Self {
            config,
            access_gate,
            connector,
            relay_settings,
            ws_connections: AtomicUsize::new(0),
            connections_per_ip: DashMap::new(),
        })
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::Acquire)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.connections_per_ip.get(ip).map(|c| *c).unwrap_or(0)
    }

    /// Reserve a WebSocket connection slot for `ip`.
    ///
    /// The slot is released when the returned guard and all its clones are
    /// dropped.
    pub fn try_acquire_connection(
        self: &Arc<Self>,
        ip: IpAddr,
    ) -> Result<ConnectionSlot, ConnectionLimitError> {
        if let Some(max) = self.config.max_websocket_connections {
            self.ws_connections
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    (current < max).then_some(current + 1)
                })
                .map_err(|_| ConnectionLimitError::GlobalLimitReached)?;
        } else {
            self.ws_connections.fetch_add(1, Ordering::AcqRel);
        }

        let max_per_ip = self.config.max_connections_per_ip;
        let mut count = self.connections_per_ip.entry(ip).or_insert(0);
        if *count >= max_per_ip {
            drop(count);
            self.ws_connections.fetch_sub(1, Ordering::AcqRel);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *count += 1;
        drop(count);

        Ok(ConnectionSlot {
            inner: Arc::new(SlotInner {
                state: Arc::clone(self),
                ip,
            }),
        })
    }

    fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            });

        if let Entry::Occupied(mut entry) = self.connections_per_ip.entry(ip) {
            let count = entry.get_mut();
            *count = count.saturating_sub(1);
            if *count == 0 {
                entry.remove();
            }
        }
    }
}

/// A reserved connection slot. Cloning shares the same reservation.
#[derive(Clone)]
pub struct ConnectionSlot {
    inner: Arc<SlotInner>,
}

impl ConnectionSlot {
    pub fn ip(&self) -> IpAddr {
        self.inner.ip
    }
}

impl std::fmt::Debug for ConnectionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSlot")
            .field("ip", &self.inner.ip)
            .finish()
    }
}

struct SlotInner {
    state: Arc<AppState>,
    ip: IpAddr,
}

impl Drop for SlotInner {
    fn drop(&mut self) {
        self.state.release_connection(self.ip);
    }
}
