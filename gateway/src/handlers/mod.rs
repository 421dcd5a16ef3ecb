//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `relay` - Relay WebSocket endpoint

pub mod api;
pub mod relay;

pub use relay::relay_handler;
