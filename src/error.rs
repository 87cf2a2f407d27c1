//! Error type for dispatched calls
//!
//! Two failure classes, kept apart:
//! - `Transport`: no usable response was received (connection failure,
//!   malformed body). Carries no status code and is never eligible for the
//!   refresh-and-replay path.
//! - `Http`: the backend answered with its structured failure envelope. The
//!   status, heading, and message are preserved verbatim all the way back to
//!   the original caller, including when a credential refresh fails or is
//!   not attempted.

/// Unified failure outcome for a dispatched call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CallError {
    /// No response was received from the backend.
    #[error("transport failure: {reason}")]
    Transport {
        /// Human-readable description of what went wrong on the wire.
        reason: String,
    },
    /// The backend answered with a failure envelope.
    #[error("{heading} ({status}): {message}")]
    Http {
        /// Numeric status code from the backend.
        status: u16,
        /// Short failure heading from the envelope.
        heading: String,
        /// Detailed failure message from the envelope.
        message: String,
    },
}

impl CallError {
    /// Construct a transport-level failure.
    pub fn transport(reason: impl Into<String>) -> Self {
        CallError::Transport { reason: reason.into() }
    }

    /// Construct an HTTP-level failure envelope.
    pub fn http(status: u16, heading: impl Into<String>, message: impl Into<String>) -> Self {
        CallError::Http { status, heading: heading.into(), message: message.into() }
    }

    /// Status code, if the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::Http { status, .. } => Some(*status),
            CallError::Transport { .. } => None,
        }
    }

    /// Check if this failure happened below the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, CallError::Transport { .. })
    }

    /// Check if this failure is a backend envelope.
    pub fn is_http(&self) -> bool {
        matches!(self, CallError::Http { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_display_carries_envelope_fields() {
        let err = CallError::http(401, "Unauthorized", "session expired");
        let msg = format!("{}", err);
        assert!(msg.contains("401"));
        assert!(msg.contains("Unauthorized"));
        assert!(msg.contains("session expired"));
    }

    #[test]
    fn transport_display_has_no_status() {
        let err = CallError::transport("connection reset");
        let msg = format!("{}", err);
        assert!(msg.contains("connection reset"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn status_accessor_only_for_http() {
        assert_eq!(CallError::http(500, "Internal", "boom").status(), Some(500));
        assert_eq!(CallError::transport("down").status(), None);
    }

    #[test]
    fn class_predicates() {
        assert!(CallError::transport("x").is_transport());
        assert!(!CallError::transport("x").is_http());
        assert!(CallError::http(404, "Not Found", "missing").is_http());
        assert!(!CallError::http(404, "Not Found", "missing").is_transport());
    }
}
