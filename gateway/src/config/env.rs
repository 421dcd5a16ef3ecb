use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;

use super::{
    DEFAULT_MAX_CONNECTIONS_PER_IP, DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECONDS, ServerConfig,
    TlsConfig,
};
use crate::core::relay::{DEFAULT_PENDING_CAPACITY, OverflowPolicy};
use crate::core::upstream::GEMINI_LIVE_URL;

/// Read a variable, treating unset and blank values the same way.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read a secret exactly as set. Only an empty value counts as unset.
fn secret_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Read and parse a variable, naming it in the error on failure.
fn parse_var<T>(name: &str) -> Result<Option<T>, Box<dyn Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name} '{raw}': {e}").into()),
        None => Ok(None),
    }
}

/// Build a TLS config from a pair of optional paths. One without the other is an error.
pub(super) fn tls_from_paths(
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, Box<dyn Error>> {
    match (cert_path, key_path) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err("TLS certificate path is set but the key path is missing".into()),
        (None, Some(_)) => Err("TLS key path is set but the certificate path is missing".into()),
    }
}

/// Load configuration from environment variables, falling back to defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn Error>> {
    let tls = tls_from_paths(var("TLS_CERT_PATH"), var("TLS_KEY_PATH"))?;

    Ok(ServerConfig {
        host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        port: parse_var("PORT")?.unwrap_or(8080),
        tls,
        static_dir: var("STATIC_DIR").map(PathBuf::from),
        access_password: secret_var("PASSWORD"),
        gemini_api_key: var("GEMINI_API_KEY"),
        upstream_url: var("UPSTREAM_URL").unwrap_or_else(|| GEMINI_LIVE_URL.to_string()),
        upstream_connect_timeout_seconds: parse_var("UPSTREAM_CONNECT_TIMEOUT_SECONDS")?
            .unwrap_or(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECONDS),
        pending_queue_capacity: parse_var("PENDING_QUEUE_CAPACITY")?
            .unwrap_or(DEFAULT_PENDING_CAPACITY),
        pending_queue_overflow: parse_var::<OverflowPolicy>("PENDING_QUEUE_OVERFLOW")?
            .unwrap_or_default(),
        cors_allowed_origins: var("CORS_ALLOWED_ORIGINS"),
        max_websocket_connections: parse_var("MAX_WEBSOCKET_CONNECTIONS")?,
        max_connections_per_ip: parse_var("MAX_CONNECTIONS_PER_IP")?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS_PER_IP),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AccessGate, AccessGrant};
    use serial_test::serial;

    #[test]
    fn test_tls_from_paths() {
        assert!(tls_from_paths(None, None).unwrap().is_none());

        let tls = tls_from_paths(Some("cert.pem".into()), Some("key.pem".into()))
            .unwrap()
            .unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("cert.pem"));
        assert_eq!(tls.key_path, PathBuf::from("key.pem"));

        assert!(tls_from_paths(Some("cert.pem".into()), None).is_err());
        assert!(tls_from_paths(None, Some("key.pem".into())).is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_port_names_variable() {
        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let err = load_from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));

        unsafe {
            env::remove_var("PORT");
        }
    }

    #[test]
    #[serial]
    fn test_invalid_overflow_policy() {
        unsafe {
            env::set_var("PENDING_QUEUE_OVERFLOW", "block");
        }

        let err = load_from_env().unwrap_err();
        assert!(err.to_string().contains("PENDING_QUEUE_OVERFLOW"));

        unsafe {
            env::remove_var("PENDING_QUEUE_OVERFLOW");
        }
    }

    #[test]
    #[serial]
    fn test_empty_password_is_unset() {
        unsafe {
            env::set_var("PASSWORD", "");
        }

        let config = load_from_env().unwrap();
        assert!(config.access_password.is_none());

        unsafe {
            env::remove_var("PASSWORD");
        }
    }

    #[test]
    #[serial]
    fn test_whitespace_password_keeps_gate_closed() {
        unsafe {
            env::set_var("PASSWORD", "   ");
        }

        let config = load_from_env().unwrap();
        assert_eq!(config.access_password.as_deref(), Some("   "));

        let gate = AccessGate::new(config.access_password.clone());
        assert!(!gate.is_open());
        assert!(gate.check(None).is_err());
        assert!(gate.check(Some("")).is_err());
        assert_eq!(gate.check(Some("   ")).unwrap(), AccessGrant::Verified);

        unsafe {
            env::remove_var("PASSWORD");
        }
    }

    #[test]
    #[serial]
    fn test_password_surrounding_spaces_are_significant() {
        unsafe {
            env::set_var("PASSWORD", " case221 ");
        }

        let config = load_from_env().unwrap();
        assert_eq!(config.access_password.as_deref(), Some(" case221 "));

        let gate = AccessGate::new(config.access_password.clone());
        assert_eq!(gate.check(Some(" case221 ")).unwrap(), AccessGrant::Verified);
        assert!(gate.check(Some("case221")).is_err());

        unsafe {
            env::remove_var("PASSWORD");
        }
    }
}
