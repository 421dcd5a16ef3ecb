//! Gemini Live upstream connector.
//!
//! Connects to the `BidiGenerateContent` WebSocket endpoint with the
//! server-held API key embedded in the `key` query parameter. The client's
//! own credential is never forwarded.

use std::fmt;

use tracing::debug;
use url::Url;
use zeroize::Zeroizing;

use super::{PendingUpstream, UpstreamConnector};
use crate::config::ServerConfig;
use crate::core::relay::Transport;
use crate::errors::{RelayError, RelayResult};

/// Gemini Live API WebSocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// Build the upstream URL for one connection attempt.
pub fn build_upstream_url(endpoint: &str, api_key: &str) -> RelayResult<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| RelayError::InvalidUpstreamUrl(format!("{endpoint}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(RelayError::InvalidUpstreamUrl(format!(
                "unsupported scheme '{other}', expected ws or wss"
            )));
        }
    }

    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

/// Connector for the Gemini Live streaming API.
pub struct GeminiLiveConnector {
    endpoint: String,
    api_key: Option<Zeroizing<String>>,
}

impl GeminiLiveConnector {
    /// Create a connector. An empty key counts as missing.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.is_empty()).map(Zeroizing::new),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.upstream_url.clone(), config.gemini_api_key.clone())
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for GeminiLiveConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiLiveConnector")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl UpstreamConnector for GeminiLiveConnector {
    fn open(&self) -> RelayResult<PendingUpstream> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RelayError::MissingUpstreamCredential)?;
        let url = Zeroizing::new(build_upstream_url(&self.endpoint, api_key)?.to_string());
        let endpoint = self.endpoint.clone();

        Ok(Box::pin(async move {
            let (socket, response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| RelayError::ConnectionFailed(e.to_string()))?;

            debug!(
                endpoint = %endpoint,
                status = %response.status(),
                "Upstream WebSocket handshake complete"
            );

            Ok::<_, RelayError>(Transport::from_upstream_socket(socket))
        }))
    }

    fn name(&self) -> &str {
        "gemini-live"
    }
}
