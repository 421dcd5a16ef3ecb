use serde::Serialize;
use thiserror::Error;

/// Errors produced by the access gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A password is configured and the request did not present it
    #[error("Access denied")]
    AccessDenied,
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Payload sent to a client right before its connection is closed.
#[derive(Debug, Clone, Serialize)]
pub struct RejectionPayload {
    pub error: String,
}

impl AuthError {
    /// Build the JSON frame announcing the rejection to the client.
    pub fn rejection_payload(&self) -> RejectionPayload {
        RejectionPayload {
            error: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_payload_json() {
        let payload = AuthError::AccessDenied.rejection_payload();
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"error":"Access denied"}"#);
    }
}
