//! Opaque relay frames.
//!
//! The relay never looks inside a payload. A [`Frame`] only remembers whether
//! the bytes arrived as a text or a binary WebSocket message so that the other
//! leg receives the same message type. Control frames (ping, pong, close) are
//! handled by each leg's WebSocket stack and never become frames.

use axum::extract::ws::Message as ClientMessage;
use bytes::Bytes;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

/// A data frame travelling through a relay session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text message
    Text(String),
    /// Binary message
    Binary(Bytes),
}

impl Frame {
    /// Create a text frame.
    pub fn text(text: impl Into<String>) -> Self {
        Frame::Text(text.into())
    }

    /// Create a binary frame.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Frame::Binary(data.into())
    }

    /// Payload size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) => data.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Text(_) => "text",
            Frame::Binary(_) => "binary",
        }
    }

    /// Convert a message read from the browser client.
    ///
    /// Returns `None` for control messages.
    pub fn from_client_message(message: ClientMessage) -> Option<Self> {
        match message {
            ClientMessage::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
            ClientMessage::Binary(data) => Some(Frame::Binary(data)),
            ClientMessage::Ping(_) | ClientMessage::Pong(_) | ClientMessage::Close(_) => None,
        }
    }

    /// Convert a message read from the upstream service.
    ///
    /// Returns `None` for control messages and raw frames.
    pub fn from_upstream_message(message: UpstreamMessage) -> Option<Self> {
        match message {
            UpstreamMessage::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
            UpstreamMessage::Binary(data) => Some(Frame::Binary(data)),
            UpstreamMessage::Ping(_)
            | UpstreamMessage::Pong(_)
            | UpstreamMessage::Close(_)
            | UpstreamMessage::Frame(_) => None,
        }
    }
}

impl From<Frame> for ClientMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => ClientMessage::Text(text.into()),
            Frame::Binary(data) => ClientMessage::Binary(data),
        }
    }
}

impl From<Frame> for UpstreamMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => UpstreamMessage::Text(text.into()),
            Frame::Binary(data) => UpstreamMessage::Binary(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len_and_kind() {
        let text = Frame::text("hello");
        assert_eq!(text.len(), 5);
        assert_eq!(text.kind(), "text");

        let binary = Frame::binary(vec![1u8, 2, 3]);
        assert_eq!(binary.len(), 3);
        assert_eq!(binary.kind(), "binary");

        assert!(Frame::text("").is_empty());
    }

    #[test]
    fn test_client_control_messages_are_not_frames() {
        assert!(Frame::from_client_message(ClientMessage::Ping(Bytes::new())).is_none());
        assert!(Frame::from_client_message(ClientMessage::Pong(Bytes::new())).is_none());
        assert!(Frame::from_client_message(ClientMessage::Close(None)).is_none());
    }

    #[test]
    fn test_upstream_control_messages_are_not_frames() {
        assert!(Frame::from_upstream_message(UpstreamMessage::Ping(Bytes::new())).is_none());
        assert!(Frame::from_upstream_message(UpstreamMessage::Close(None)).is_none());
    }

    #[test]
    fn test_binary_payload_is_preserved_across_legs() {
        let payload = Bytes::from_static(&[0x00, 0xff, 0x10, 0x80]);
        let frame = Frame::from_client_message(ClientMessage::Binary(payload.clone())).unwrap();

        match UpstreamMessage::from(frame) {
            UpstreamMessage::Binary(data) => assert_eq!(data, payload),
            other => panic!("Expected binary message, got {other:?}"),
        }
    }

    #[test]
    fn test_text_type_is_preserved_across_legs() {
        let frame =
            Frame::from_upstream_message(UpstreamMessage::Text(r#"{"serverContent":{}}"#.into()))
                .unwrap();
        assert_eq!(frame, Frame::text(r#"{"serverContent":{}}"#));

        match ClientMessage::from(frame) {
            ClientMessage::Text(text) => assert_eq!(text.as_str(), r#"{"serverContent":{}}"#),
            other => panic!("Expected text message, got {other:?}"),
        }
    }
}
