//! Single-flight gate over the credential refresh operation
//!
//! When a session credential expires, every request in flight fails at
//! roughly the same instant. The coordinator guarantees that exactly one
//! refresh call is made: the first caller to arrive becomes the initiator,
//! every other caller is parked on a one-shot channel, and all of them
//! (initiator included) observe the outcome of the one refresh that
//! actually ran.
//!
//! Semantics:
//! - The internal lock guards bookkeeping only (the in-progress flag and
//!   the waiter queue); the refresh network call always runs outside it, so
//!   callers can keep enqueueing while it is in flight.
//! - The refresh is driven on its own task: cancelling any caller, the
//!   initiator included, never aborts a refresh other callers are parked on.
//! - The queue is drained in the same critical section that clears the
//!   in-progress flag, so a waiter can never observe a later refresh's
//!   outcome.
//! - Every invoker error (no identity, endpoint failure, timeout) maps to
//!   `false` and is never re-thrown; the caller still owns the decision of
//!   how to surface its original request failure.
//!
//! Invariants:
//! - At most one refresh call is in flight per coordinator at any instant.
//! - Each waiter is notified exactly once, all with the same boolean.
//! - The refresh call is always bounded by the configured timeout; no
//!   waiter is left suspended indefinitely.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::CallError;

/// Reasons a refresh could not be obtained.
///
/// Produced by the refresh invoker handed to
/// [`RefreshCoordinator::coordinate`]; every variant maps to a `false`
/// coordination outcome for the initiator and all waiters.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RefreshError {
    /// No subject was resolvable from any identity source; no network call
    /// was made.
    #[error("no identity context available")]
    NoIdentity,
    /// The refresh endpoint answered with a failure.
    #[error("refresh endpoint failed: {0}")]
    Endpoint(#[from] CallError),
}

/// Validated coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    refresh_timeout: Duration,
}

/// Errors produced when validating coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CoordinatorConfigError {
    /// The refresh timeout must be non-zero and finite.
    #[error("refresh_timeout must be non-zero and finite (got {0:?})")]
    InvalidRefreshTimeout(Duration),
}

impl CoordinatorConfig {
    /// Create a config with validation. The timeout bounds the refresh
    /// network call; a timed-out refresh counts as a failed one.
    pub fn new(refresh_timeout: Duration) -> Result<Self, CoordinatorConfigError> {
        if refresh_timeout == Duration::ZERO || refresh_timeout == Duration::MAX {
            return Err(CoordinatorConfigError::InvalidRefreshTimeout(refresh_timeout));
        }
        Ok(Self { refresh_timeout })
    }

    /// Upper bound on the refresh call.
    pub fn refresh_timeout(&self) -> Duration {
        self.refresh_timeout
    }
}

impl Default for CoordinatorConfig {
    /// 10 second refresh timeout.
    fn default() -> Self {
        Self { refresh_timeout: Duration::from_secs(10) }
    }
}

#[derive(Debug, Default)]
struct RefreshState {
    in_progress: bool,
    waiters: Vec<oneshot::Sender<bool>>,
}

/// Single-flight gate over the refresh operation.
///
/// Clones share the same underlying state via `Arc`, so every dispatcher
/// holding a clone participates in the same single-flight lifecycle. Create
/// one per execution context at startup and inject it everywhere; separate
/// coordinators coordinate nothing with each other.
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    state: Arc<Mutex<RefreshState>>,
    config: CoordinatorConfig,
}

impl RefreshCoordinator {
    /// Coordinator with the default config.
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    /// Coordinator with an explicit, validated config.
    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self { state: Arc::new(Mutex::new(RefreshState::default())), config }
    }

    /// Whether a refresh call is currently in flight.
    pub fn refresh_in_progress(&self) -> bool {
        self.state.lock().unwrap().in_progress
    }

    /// Run `refresh` under the single-flight gate.
    ///
    /// Returns `true` when a refresh succeeded and callers may safely
    /// replay. If a refresh is already in flight the call suspends until it
    /// resolves and returns that refresh's outcome instead of starting
    /// another. The invoker is expected to resolve its identity context
    /// first and return [`RefreshError::NoIdentity`] without a network call
    /// when none is available.
    pub async fn coordinate<F, Fut>(&self, refresh: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), RefreshError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let initiate = {
            let mut state = self.state.lock().unwrap();
            state.waiters.push(tx);
            if state.in_progress {
                false
            } else {
                state.in_progress = true;
                true
            }
        };

        if initiate {
            let gate = self.clone();
            // Driven on its own task: dropping the initiating caller must
            // not abort a refresh that other callers are parked on.
            tokio::spawn(async move {
                let outcome = gate.run_refresh(refresh).await;
                gate.release(outcome);
            });
        }

        rx.await.unwrap_or(false)
    }

    async fn run_refresh<F, Fut>(&self, refresh: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), RefreshError>>,
    {
        let timeout = self.config.refresh_timeout;
        tracing::debug!("credential refresh started");
        match tokio::time::timeout(timeout, refresh()).await {
            Ok(Ok(())) => {
                tracing::debug!("credential refresh succeeded");
                true
            }
            Ok(Err(RefreshError::NoIdentity)) => {
                tracing::warn!("credential refresh skipped: no identity context");
                false
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "credential refresh failed");
                false
            }
            Err(_) => {
                tracing::warn!(?timeout, "credential refresh timed out");
                false
            }
        }
    }

    /// Clear the flag and drain the queue in one critical section, then
    /// notify outside the lock.
    fn release(&self, outcome: bool) {
        let waiters = {
            let mut state = self.state.lock().unwrap();
            state.in_progress = false;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            // A cancelled caller has dropped its receiver; skipping it must
            // not affect the rest of the queue.
            let _ = waiter.send(outcome);
        }
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
