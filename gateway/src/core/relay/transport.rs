//! Frame-level transport halves.
//!
//! A relay session does not care whether a leg is the axum socket of the
//! browser client or the tungstenite socket of the upstream service. Both are
//! adapted into a boxed [`Sink`] of frames and a boxed [`Stream`] of frames.
//! The stream ends when the peer sends a close frame or the connection drops.

use std::pin::Pin;

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

use super::frame::Frame;
use crate::errors::{RelayError, RelayResult};

/// Write half of a relay leg.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = RelayError> + Send>>;

/// Read half of a relay leg.
pub type FrameStream = Pin<Box<dyn Stream<Item = RelayResult<Frame>> + Send>>;

/// Both halves of one relay leg.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Transport {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }

    pub fn into_parts(self) -> (FrameSink, FrameStream) {
        (self.sink, self.stream)
    }

    /// Adapt an accepted browser WebSocket.
    pub fn from_client_socket(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();

        let sink = sink.with(|frame: Frame| {
            future::ready(Ok::<ClientMessage, RelayError>(ClientMessage::from(frame)))
        });

        let stream = stream
            .take_while(|message| future::ready(!matches!(message, Ok(ClientMessage::Close(_)))))
            .filter_map(|message| {
                future::ready(match message {
                    Ok(message) => Frame::from_client_message(message).map(Ok),
                    Err(err) => Some(Err(RelayError::from(err))),
                })
            });

        Self::new(Box::pin(sink), Box::pin(stream))
    }

    /// Adapt a connected upstream WebSocket.
    pub fn from_upstream_socket<S>(socket: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = socket.split();

        let sink = sink.with(|frame: Frame| {
            future::ready(Ok::<UpstreamMessage, RelayError>(UpstreamMessage::from(
                frame,
            )))
        });

        let stream = stream
            .take_while(|message| {
                future::ready(!matches!(message, Ok(UpstreamMessage::Close(_))))
            })
            .filter_map(|message| {
                future::ready(match message {
                    Ok(message) => Frame::from_upstream_message(message).map(Ok),
                    Err(err) => Some(Err(RelayError::from(err))),
                })
            });

        Self::new(Box::pin(sink), Box::pin(stream))
    }
}
