//! Error types for the store crate.
//!
//! Absence is never an error here: lookups on missing or expired entries
//! return `None`. The enums below cover the two real fault surfaces: a
//! snapshot that cannot be decoded, and the flow-level conflict checks the
//! store itself deliberately does not perform.

use thiserror::Error;

/// Failure to decode a persisted snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot text is not valid JSON, or lacks the expected `logins`
    /// and `users` mappings.
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result alias for the authentication flows.
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors surfaced by the registration, login and session flows.
///
/// These express the conflict checks the calling layer performs before
/// writing to the store (`register_start`, `login_start`) plus session
/// lookups that come back empty.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("user already registered")]
    UserAlreadyRegistered,

    #[error("user not registered")]
    UserNotRegistered,

    #[error("login already started")]
    LoginAlreadyStarted,

    #[error("login not started")]
    LoginNotStarted,

    #[error("invalid session")]
    InvalidSession,

    /// The external key exchange rejected a payload.
    #[error("key exchange failed: {0}")]
    Pake(#[from] PakeError),
}

/// Opaque failure reported by the external key-exchange implementation.
///
/// The message is whatever the implementation chose to say; the flows never
/// inspect it beyond propagating it.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct PakeError {
    message: String,
}

impl PakeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_error_messages_are_short_and_stable() {
        assert_eq!(
            FlowError::UserAlreadyRegistered.to_string(),
            "user already registered"
        );
        assert_eq!(FlowError::InvalidSession.to_string(), "invalid session");
        assert_eq!(
            FlowError::Pake(PakeError::new("bad envelope")).to_string(),
            "key exchange failed: bad envelope"
        );
    }

    #[test]
    fn snapshot_error_wraps_serde_failures() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let wrapped = SnapshotError::from(err);
        assert!(wrapped.to_string().starts_with("malformed snapshot:"));
    }
}
