//! Error types for the proximity reporter core.
//!
//! Only conditions the loop cannot absorb by itself become errors here.
//! Transient link, session and scan failures are logged and retried at the
//! call site; they never leave the core as values.

use thiserror::Error;

use crate::connectivity::ConnectionState;

/// Invalid static configuration. Detected once, at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The radio cannot listen longer than the interval it listens in.
    #[error("scan window ({window_ms} ms) exceeds scan interval ({interval_ms} ms)")]
    WindowExceedsInterval { interval_ms: u16, window_ms: u16 },

    /// A timing value that must be positive was zero.
    #[error("{0} must be non-zero")]
    Zero(&'static str),

    /// The name prefix does not fit the fixed-size prefix buffer.
    #[error("name prefix longer than {max} bytes")]
    PrefixTooLong { max: usize },

    /// The name prefix holds a character that would need JSON escaping.
    #[error("name prefix may only contain printable ASCII without quotes or backslashes")]
    PrefixCharacter,

    /// A required setting was left empty.
    #[error("{0} must not be empty")]
    Missing(&'static str),

    /// A setting could not be parsed.
    #[error("invalid value for {0}")]
    InvalidValue(&'static str),
}

/// Failure of the identity provider. Always fatal: no session can be
/// formed without an identifier and a credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("identity provider unavailable")]
    Unavailable,

    #[error("device identifier is empty")]
    EmptyId,

    #[error("device identifier is not hexadecimal")]
    NotHex,

    #[error("device identifier longer than {max} characters")]
    IdTooLong { max: usize },

    #[error("no session credential available")]
    NoCredential,
}

/// Shadow document encode/decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Serialized form does not fit the buffer. Recoverable: the publish is
    /// skipped and the document stays open.
    #[error("serialized document exceeds {capacity} bytes")]
    Overflow { capacity: usize },

    #[error("malformed shadow document")]
    Malformed,
}

/// Result of a deadline-bounded connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadyError {
    /// The deadline passed before the session became ready.
    #[error("connection still down at deadline (state: {})", .0.as_str())]
    StillDown(ConnectionState),

    #[error(transparent)]
    Fatal(#[from] IdentityError),
}

/// Conditions that halt the agent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("identity: {0}")]
    Identity(#[from] IdentityError),
}

impl ReadyError {
    /// Returns `true` if retrying can never succeed.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_name_the_setting() {
        let err = ConfigError::WindowExceedsInterval {
            interval_ms: 100,
            window_ms: 120,
        };
        let msg = format!("{err}");
        assert!(msg.contains("120 ms"));
        assert!(msg.contains("100 ms"));

        assert_eq!(
            format!("{}", ConfigError::Missing("wifi ssid")),
            "wifi ssid must not be empty"
        );
    }

    #[test]
    fn ready_error_fatal_classification() {
        assert!(ReadyError::Fatal(IdentityError::NoCredential).is_fatal());
        assert!(!ReadyError::StillDown(ConnectionState::NetworkDown).is_fatal());
    }

    #[test]
    fn still_down_reports_state() {
        let msg = format!(
            "{}",
            ReadyError::StillDown(ConnectionState::NetworkUpSessionDown)
        );
        assert!(msg.contains("session_down"));
    }

    #[test]
    fn agent_error_wraps_identity_error() {
        let err: AgentError = IdentityError::Unavailable.into();
        assert_eq!(err, AgentError::Identity(IdentityError::Unavailable));
        assert!(format!("{err}").starts_with("identity:"));
    }
}
