//! Error types and handling
//!
//! Common error types used across the session controller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a session-level failure.
///
/// `MissingPermissions` is the only kind that moves the controller into the
/// top-level `Error` state; `CaptureDenied` stays local to the `Initial`
/// states and preserves the device catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Device enumeration or user-media access was denied
    MissingPermissions,
    /// Display capture was denied or cancelled by the user
    CaptureDenied,
    /// Anything else; the cause string carries the original failure
    Unknown,
}

/// A failure attached to the session context.
///
/// Immutable once constructed; the cause is rendered to a string so the
/// snapshot stays serializable and comparable in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub cause: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, cause: impl std::fmt::Display) -> Self {
        Self {
            kind,
            cause: cause.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ErrorKind::MissingPermissions => write!(f, "missing permissions: {}", self.cause),
            ErrorKind::CaptureDenied => write!(f, "capture denied: {}", self.cause),
            ErrorKind::Unknown => write!(f, "unknown error: {}", self.cause),
        }
    }
}

/// Errors surfaced by the controller's public API
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("controller is shut down")]
    ControllerClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using SessionError
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_serializes_camel_case() {
        let info = ErrorInfo::new(ErrorKind::MissingPermissions, "mic denied");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["kind"], "missingPermissions");
        assert_eq!(json["cause"], "mic denied");
    }

    #[test]
    fn test_display_includes_kind_and_cause() {
        let info = ErrorInfo::new(ErrorKind::CaptureDenied, "picker dismissed");
        assert_eq!(info.to_string(), "capture denied: picker dismissed");
    }
}
