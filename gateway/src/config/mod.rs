//! Configuration module for the relay server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use live_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

use crate::core::relay::{DEFAULT_PENDING_CAPACITY, OverflowPolicy, RelaySettings};
use crate::core::upstream::GEMINI_LIVE_URL;

pub use yaml::YamlConfig;

/// Default upstream handshake timeout in seconds
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECONDS: u64 = 15;

/// Default per-IP connection cap
pub const DEFAULT_MAX_CONNECTIONS_PER_IP: u32 = 100;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains:
/// - Listener settings (host, port, optional TLS, static UI directory)
/// - The shared access password checked on every relay connection
/// - Upstream endpoint, API key and handshake timeout
/// - Pending queue bounds for sessions that are still connecting
/// - Security settings (CORS, connection limits)
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Directory served as a static fallback (browser UI)
    pub static_dir: Option<PathBuf>,

    // Access gate
    /// Shared password clients present as the `password` query parameter.
    /// `None` accepts every connection.
    pub access_password: Option<String>,

    // Upstream
    /// Gemini API key, never sent to clients
    pub gemini_api_key: Option<String>,
    pub upstream_url: String,
    pub upstream_connect_timeout_seconds: u64,

    // Relay
    /// Frames staged per session while the upstream connects (0 = unbounded)
    pub pending_queue_capacity: usize,
    pub pending_queue_overflow: OverflowPolicy,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Connection limits
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tls: None,
            static_dir: None,
            access_password: None,
            gemini_api_key: None,
            upstream_url: GEMINI_LIVE_URL.to_string(),
            upstream_connect_timeout_seconds: DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECONDS,
            pending_queue_capacity: DEFAULT_PENDING_CAPACITY,
            pending_queue_overflow: OverflowPolicy::default(),
            cors_allowed_origins: None,
            max_websocket_connections: None,
            max_connections_per_ip: DEFAULT_MAX_CONNECTIONS_PER_IP,
        }
    }
}

/// Zeroize secret fields when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut password) = self.access_password {
            password.zeroize();
        }
        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("static_dir", &self.static_dir)
            .field("access_password", &self.access_password.as_ref().map(|_| "<redacted>"))
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("upstream_url", &self.upstream_url)
            .field(
                "upstream_connect_timeout_seconds",
                &self.upstream_connect_timeout_seconds,
            )
            .field("pending_queue_capacity", &self.pending_queue_capacity)
            .field("pending_queue_overflow", &self.pending_queue_overflow)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("max_websocket_connections", &self.max_websocket_connections)
            .field("max_connections_per_ip", &self.max_connections_per_ip)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The `.env` file is loaded in `main.rs` before this is called, so its
    /// values are visible here unless the real environment overrides them.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let mut config = env::load_from_env()?;
        merge::apply_yaml(&mut config, yaml_config)?;

        validation::validate(&config)?;

        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is configured
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Check if the access gate requires a password
    pub fn has_access_password(&self) -> bool {
        self.access_password
            .as_ref()
            .is_some_and(|password| !password.is_empty())
    }

    pub fn upstream_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_connect_timeout_seconds)
    }

    /// Session tunables derived from this configuration
    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            pending_capacity: self.pending_queue_capacity,
            overflow_policy: self.pending_queue_overflow,
            connect_timeout: self.upstream_connect_timeout(),
        }
    }
}
