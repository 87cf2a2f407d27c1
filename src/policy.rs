//! Refresh-retry decision rule
//!
//! A pure, stateless unit: given a call's failure and its descriptor,
//! decide whether the refresh-and-replay path is permitted. It lives apart
//! from the coordination machinery so the rule is independently testable
//! and swappable; treating further statuses as refresh-eligible touches
//! nothing else.
//!
//! Example
//! ```rust
//! use authgate::{CallDescriptor, CallError, Method, RefreshPolicy};
//!
//! let policy = RefreshPolicy::new();
//! let call = CallDescriptor::new(Method::Get, ["wallet"]);
//! let expired = CallError::http(401, "Unauthorized", "session expired");
//!
//! assert!(policy.should_attempt_refresh(&expired, &call));
//! // A replayed call is never refreshed a second time.
//! assert!(!policy.should_attempt_refresh(&expired, &call.into_replay()));
//! ```

use crate::descriptor::CallDescriptor;
use crate::error::CallError;

/// Status the backend answers with when the session credential expired.
pub const AUTHORIZATION_EXPIRED: u16 = 401;

/// Decision rule for the refresh-and-replay path.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    statuses: Vec<u16>,
}

impl RefreshPolicy {
    /// Rule that refreshes on [`AUTHORIZATION_EXPIRED`] only.
    pub fn new() -> Self {
        Self { statuses: vec![AUTHORIZATION_EXPIRED] }
    }

    /// Treat an additional status as refresh-eligible.
    pub fn with_status(mut self, status: u16) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    /// True only when all three hold: the failure is an HTTP failure with a
    /// refresh-eligible status, the call is retry-eligible, and the call is
    /// not already a replay.
    pub fn should_attempt_refresh(&self, error: &CallError, descriptor: &CallDescriptor) -> bool {
        let eligible_status = match error.status() {
            Some(status) => self.statuses.contains(&status),
            None => false,
        };
        eligible_status && descriptor.is_retry_eligible() && !descriptor.is_replay()
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new()
    }
}
