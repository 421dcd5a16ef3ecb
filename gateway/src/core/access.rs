//! Shared-secret access gate.
//!
//! Every inbound relay connection presents a `password` query parameter. When
//! the server has a password configured the credential must match it
//! byte-for-byte; otherwise the gate is open and accepts everyone. The check
//! runs once per connection and keeps no state.

use std::fmt;

use subtle::ConstantTimeEq;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::errors::{AuthError, AuthResult};

/// How a connection got through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGrant {
    /// No password configured
    Open,
    /// Credential matched the configured password
    Verified,
}

/// Access gate evaluated before any relay work begins.
#[derive(Clone, Default)]
pub struct AccessGate {
    secret: Option<Zeroizing<String>>,
}

impl AccessGate {
    /// Create a gate. `None` or an empty secret puts the gate in open mode.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(Zeroizing::new),
        }
    }

    /// A gate that accepts every connection.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    /// Check the credential presented by a connection.
    pub fn check(&self, credential: Option<&str>) -> AuthResult<AccessGrant> {
        let Some(secret) = self.secret.as_deref() else {
            info!("Access granted (no password configured)");
            return Ok(AccessGrant::Open);
        };

        let matches = credential
            .map(|provided| bool::from(provided.as_bytes().ct_eq(secret.as_bytes())))
            .unwrap_or(false);

        if matches {
            info!("Access granted");
            Ok(AccessGrant::Verified)
        } else {
            warn!(
                credential_present = credential.is_some(),
                "Access denied: password mismatch"
            );
            Err(AuthError::AccessDenied)
        }
    }
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_gate_accepts_anything() {
        let gate = AccessGate::new(None);
        assert!(gate.is_open());
        assert_eq!(gate.check(None), Ok(AccessGrant::Open));
        assert_eq!(gate.check(Some("")), Ok(AccessGrant::Open));
        assert_eq!(gate.check(Some("whatever")), Ok(AccessGrant::Open));
    }

    #[test]
    fn test_empty_secret_means_open() {
        let gate = AccessGate::new(Some(String::new()));
        assert!(gate.is_open());
        assert_eq!(gate.check(Some("x")), Ok(AccessGrant::Open));
    }

    #[test]
    fn test_matching_credential_is_verified() {
        let gate = AccessGate::new(Some("case221".to_string()));
        assert_eq!(gate.check(Some("case221")), Ok(AccessGrant::Verified));
    }

    #[test]
    fn test_mismatch_is_denied() {
        let gate = AccessGate::new(Some("case221".to_string()));
        for candidate in ["wrong", "case22", "case2211", "CASE221", " case221", ""] {
            assert_eq!(
                gate.check(Some(candidate)),
                Err(AuthError::AccessDenied),
                "credential {candidate:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_credential_is_denied() {
        let gate = AccessGate::new(Some("case221".to_string()));
        assert_eq!(gate.check(None), Err(AuthError::AccessDenied));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let gate = AccessGate::new(Some("case221".to_string()));
        assert!(!format!("{gate:?}").contains("case221"));
    }
}
