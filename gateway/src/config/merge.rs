use std::error::Error;
use std::path::PathBuf;

use super::ServerConfig;
use super::env::tls_from_paths;
use super::yaml::YamlConfig;

/// Apply YAML values on top of an environment-derived configuration.
///
/// Only fields present in the YAML file are touched. Blank secrets in YAML
/// clear the corresponding value.
pub(super) fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) -> Result<(), Box<dyn Error>> {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(static_dir) = server.static_dir {
            config.static_dir = Some(PathBuf::from(static_dir)).filter(|p| !p.as_os_str().is_empty());
        }
        if let Some(tls) = server.tls {
            if tls.enabled == Some(false) {
                config.tls = None;
            } else if tls.cert_path.is_some() || tls.key_path.is_some() {
                let (current_cert, current_key) = match &config.tls {
                    Some(current) => (
                        Some(current.cert_path.display().to_string()),
                        Some(current.key_path.display().to_string()),
                    ),
                    None => (None, None),
                };
                config.tls = tls_from_paths(
                    tls.cert_path.or(current_cert),
                    tls.key_path.or(current_key),
                )?;
            }
        }
    }

    if let Some(access) = yaml.access
        && let Some(password) = access.password
    {
        config.access_password = Some(password).filter(|p| !p.is_empty());
    }

    if let Some(upstream) = yaml.upstream {
        if let Some(api_key) = upstream.api_key {
            config.gemini_api_key = Some(api_key).filter(|k| !k.is_empty());
        }
        if let Some(url) = upstream.url {
            config.upstream_url = url;
        }
        if let Some(timeout) = upstream.connect_timeout_seconds {
            config.upstream_connect_timeout_seconds = timeout;
        }
    }

    if let Some(relay) = yaml.relay {
        if let Some(capacity) = relay.pending_queue_capacity {
            config.pending_queue_capacity = capacity;
        }
        if let Some(policy) = relay.pending_queue_overflow {
            config.pending_queue_overflow = policy;
        }
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = security.cors_allowed_origins {
            config.cors_allowed_origins = Some(origins).filter(|o| !o.is_empty());
        }
        if let Some(max) = security.max_websocket_connections {
            config.max_websocket_connections = Some(max);
        }
        if let Some(max) = security.max_connections_per_ip {
            config.max_connections_per_ip = max;
        }
    }

    Ok(())
}
