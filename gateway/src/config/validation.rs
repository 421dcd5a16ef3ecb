use std::error::Error;

use url::Url;

use super::ServerConfig;

/// Validate a fully merged configuration.
///
/// A missing upstream API key is not an error here. It is reported per
/// connection when a session tries to open the upstream.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn Error>> {
    validate_port(config.port)?;
    validate_upstream_url(&config.upstream_url)?;
    validate_connect_timeout(config.upstream_connect_timeout_seconds)?;
    validate_connection_limits(config.max_websocket_connections, config.max_connections_per_ip)?;
    Ok(())
}

pub(super) fn validate_port(port: u16) -> Result<(), Box<dyn Error>> {
    if port == 0 {
        return Err("Server port must be non-zero".into());
    }
    Ok(())
}

pub(super) fn validate_upstream_url(url: &str) -> Result<(), Box<dyn Error>> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid upstream URL '{url}': {e}"))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(format!(
            "Upstream URL must use ws:// or wss://, got '{other}://'"
        )
        .into()),
    }
}

pub(super) fn validate_connect_timeout(seconds: u64) -> Result<(), Box<dyn Error>> {
    if seconds == 0 {
        return Err("Upstream connect timeout must be greater than zero".into());
    }
    Ok(())
}

pub(super) fn validate_connection_limits(
    max_websocket_connections: Option<usize>,
    max_connections_per_ip: u32,
) -> Result<(), Box<dyn Error>> {
    if max_websocket_connections == Some(0) {
        return Err("MAX_WEBSOCKET_CONNECTIONS must be greater than zero when set".into());
    }
    if max_connections_per_ip == 0 {
        return Err("MAX_CONNECTIONS_PER_IP must be greater than zero".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_port() {
        assert!(validate_port(8080).is_ok());
        assert!(validate_port(0).is_err());
    }

    #[test]
    fn test_validate_upstream_url() {
        assert!(validate_upstream_url("wss://example.com/live").is_ok());
        assert!(validate_upstream_url("ws://127.0.0.1:9000").is_ok());

        let err = validate_upstream_url("https://example.com").unwrap_err();
        assert!(err.to_string().contains("ws:// or wss://"));

        assert!(validate_upstream_url("not a url").is_err());
    }

    #[test]
    fn test_validate_connect_timeout() {
        assert!(validate_connect_timeout(1).is_ok());
        assert!(validate_connect_timeout(0).is_err());
    }

    #[test]
    fn test_validate_connection_limits() {
        assert!(validate_connection_limits(None, 100).is_ok());
        assert!(validate_connection_limits(Some(10), 1).is_ok());
        assert!(validate_connection_limits(Some(0), 100).is_err());
        assert!(validate_connection_limits(None, 0).is_err());
    }

    #[test]
    fn test_missing_api_key_is_allowed() {
        let config = ServerConfig::default();
        assert!(config.gemini_api_key.is_none());
        assert!(validate(&config).is_ok());
    }
}
