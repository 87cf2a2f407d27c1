//! Identity context resolution
//!
//! Requesting a credential refresh needs exactly one piece of information:
//! an opaque subject reference. No credential material is ever read here.
//! The subject is preferred from in-memory session state and falls back to
//! a durable client-side store when the session holds nothing, both behind
//! the read-only [`IdentitySource`] trait.

use std::fmt;
use std::sync::{Arc, RwLock};

/// Opaque subject identifier used to request a credential refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject(String);

impl Subject {
    /// Wrap a subject identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Subject(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only accessor for a stored subject.
///
/// Implementations must be cheap and non-blocking; the refresh invoker
/// consults them once, up front, before deciding whether a refresh call can
/// be made at all.
pub trait IdentitySource: Send + Sync {
    /// Current subject, if this source knows one.
    fn subject(&self) -> Option<Subject>;
}

/// In-memory session identity. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SessionIdentity {
    slot: Arc<RwLock<Option<Subject>>>,
}

impl SessionIdentity {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the signed-in subject.
    pub fn set(&self, subject: Subject) {
        *self.slot.write().unwrap() = Some(subject);
    }

    /// Forget the signed-in subject.
    pub fn clear(&self) {
        *self.slot.write().unwrap() = None;
    }
}

impl IdentitySource for SessionIdentity {
    fn subject(&self) -> Option<Subject> {
        self.slot.read().unwrap().clone()
    }
}

/// Resolve a subject by preferring `session` and consulting `durable` only
/// when the session holds nothing.
pub(crate) fn resolve_subject(
    session: &Arc<dyn IdentitySource>,
    durable: Option<&Arc<dyn IdentitySource>>,
) -> Option<Subject> {
    session.subject().or_else(|| durable.and_then(|source| source.subject()))
}
