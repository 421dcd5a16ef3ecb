//! Mock Upstream Server
//!
//! A minimal stand-in for the generative-AI streaming endpoint. It accepts
//! WebSocket connections, records the request URI and every data frame it
//! receives, and answers each text frame with `echo:<text>` and each binary
//! frame with the same bytes.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// Something the mock upstream observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    /// Handshake completed for this request URI
    Connected(String),
    /// Data frame received from the relay
    Frame(Message),
    /// The relay closed the connection
    Closed,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub connections: Arc<AtomicUsize>,
    pub events: mpsc::UnboundedReceiver<UpstreamEvent>,
}

impl MockUpstream {
    /// Start a mock upstream on an ephemeral port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let (events_tx, events) = mpsc::unbounded_channel();

        let counter = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle_connection(stream, events_tx.clone()));
            }
        });

        Self {
            addr,
            connections,
            events,
        }
    }

    /// Endpoint URL without credentials, as the relay would be configured
    pub fn url(&self) -> String {
        format!("ws://{}/ws/live", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub async fn next_event(&mut self) -> Option<UpstreamEvent> {
        tokio::time::timeout(std::time::Duration::from_secs(3), self.events.recv())
            .await
            .ok()
            .flatten()
    }
}

async fn handle_connection(stream: TcpStream, events: mpsc::UnboundedSender<UpstreamEvent>) {
    let uri_events = events.clone();
    let callback = move |request: &Request, response: Response| {
        let _ = uri_events.send(UpstreamEvent::Connected(request.uri().to_string()));
        Ok::<Response, ErrorResponse>(response)
    };

    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let _ = events.send(UpstreamEvent::Frame(Message::Text(text.clone())));
                let reply = format!("echo:{}", text.as_str());
                if write.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }
            Ok(Message::Binary(data)) => {
                let _ = events.send(UpstreamEvent::Frame(Message::Binary(data.clone())));
                if write.send(Message::Binary(data)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    let _ = events.send(UpstreamEvent::Closed);
}
