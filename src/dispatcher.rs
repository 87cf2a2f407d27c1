//! Request dispatch with refresh-and-replay
//!
//! One [`Dispatcher::dispatch`] call is one logical request: build the
//! target, send it, and on an authorization-expired failure coordinate a
//! credential refresh before replaying the call exactly once. The retry is
//! written as a loop over an explicit replay flag rather than recursion, so
//! the one-replay bound is structural: the replayed descriptor fails the
//! policy check, and the second pass through the loop always returns.
//!
//! The dispatcher owns no coordination state. The injected
//! [`RefreshCoordinator`] is the process-wide gate; give every dispatcher a
//! clone of the same coordinator and their refreshes single-flight
//! together.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower_layer::Layer;
use tower_service::Service;
use url::Url;

use crate::coordinator::{RefreshCoordinator, RefreshError};
use crate::descriptor::CallDescriptor;
use crate::error::CallError;
use crate::identity::{resolve_subject, IdentitySource, SessionIdentity, Subject};
use crate::policy::RefreshPolicy;
use crate::response::ApiResponse;
use crate::transport::Transport;

/// Base URL used when the builder is given none.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Errors produced while building a dispatcher.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The base URL did not parse.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    /// The base URL cannot carry path segments (e.g. `data:` URLs).
    #[error("base URL cannot carry path segments")]
    BaseCannotBeABase,
    /// No transport was provided.
    #[error("a transport is required")]
    MissingTransport,
}

/// Sends logical calls and coordinates credential refresh on authorization
/// failure.
#[derive(Clone)]
pub struct Dispatcher {
    base: Url,
    transport: Arc<dyn Transport>,
    coordinator: RefreshCoordinator,
    policy: RefreshPolicy,
    session: Arc<dyn IdentitySource>,
    durable: Option<Arc<dyn IdentitySource>>,
}

impl Dispatcher {
    /// Start building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Perform one logical call.
    ///
    /// On an authorization-expired failure of a retry-eligible call, a
    /// credential refresh is coordinated and the call replayed exactly
    /// once; the replay's outcome is returned verbatim, even if it is
    /// another authorization failure. When no refresh could be obtained
    /// (no identity, refresh failed or timed out, or a concurrent refresh
    /// failed), the *original* failure is returned untouched.
    pub async fn dispatch(&self, descriptor: CallDescriptor) -> Result<ApiResponse, CallError> {
        let mut descriptor = descriptor;
        loop {
            let target = descriptor
                .target(&self.base)
                .map_err(|err| CallError::transport(err.to_string()))?;
            let err = match self.transport.send(descriptor.method(), &target, descriptor.json_body()).await
            {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !self.policy.should_attempt_refresh(&err, &descriptor) {
                return Err(err);
            }
            if !self.coordinate_refresh().await {
                tracing::warn!(
                    method = %descriptor.method(),
                    status = ?err.status(),
                    "refresh not obtained; surfacing original failure"
                );
                return Err(err);
            }

            tracing::debug!(method = %descriptor.method(), "credential refreshed; replaying call");
            descriptor = descriptor.into_replay();
        }
    }

    async fn coordinate_refresh(&self) -> bool {
        let transport = Arc::clone(&self.transport);
        let session = Arc::clone(&self.session);
        let durable = self.durable.clone();
        self.coordinator
            .coordinate(move || async move {
                // Resolved once, up front; a session cleared mid-refresh
                // does not change the subject already in use.
                let subject = resolve_subject(&session, durable.as_ref())
                    .ok_or(RefreshError::NoIdentity)?;
                transport.refresh(&subject).await?;
                Ok(())
            })
            .await
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    base: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    coordinator: Option<RefreshCoordinator>,
    policy: RefreshPolicy,
    session: Option<Arc<dyn IdentitySource>>,
    durable: Option<Arc<dyn IdentitySource>>,
}

impl DispatcherBuilder {
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self {
            base: None,
            transport: None,
            coordinator: None,
            policy: RefreshPolicy::new(),
            session: None,
            durable: None,
        }
    }

    /// Backend base URL. Defaults to [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Transport performing the literal calls. Required.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Coordinator shared with the other dispatchers of this execution
    /// context. A fresh one is created when omitted; that is fine for a
    /// single dispatcher, wrong if several should single-flight together.
    pub fn coordinator(mut self, coordinator: RefreshCoordinator) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Refresh decision rule. Defaults to refreshing on 401 only.
    pub fn policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// In-memory session identity source. Defaults to an empty session.
    pub fn session_identity(mut self, source: Arc<dyn IdentitySource>) -> Self {
        self.session = Some(source);
        self
    }

    /// Durable fallback identity source, consulted only when the session
    /// holds no subject.
    pub fn durable_identity(mut self, source: Arc<dyn IdentitySource>) -> Self {
        self.durable = Some(source);
        self
    }

    /// Build the dispatcher, validating the base URL.
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        let base = Url::parse(self.base.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        if base.cannot_be_a_base() {
            return Err(BuildError::BaseCannotBeABase);
        }
        let transport = self.transport.ok_or(BuildError::MissingTransport)?;
        Ok(Dispatcher {
            base,
            transport,
            coordinator: self.coordinator.unwrap_or_default(),
            policy: self.policy,
            session: self.session.unwrap_or_else(|| Arc::new(SessionIdentity::new())),
            durable: self.durable,
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Refresh invocation used by [`ReplayLayer`], called with the resolved
/// subject.
pub type RefreshFn =
    Arc<dyn Fn(Subject) -> BoxFuture<'static, Result<(), CallError>> + Send + Sync>;

/// Tower-native refresh-and-replay layer.
///
/// Wraps any `Service<CallDescriptor>` speaking the envelope types with the
/// same semantics as [`Dispatcher::dispatch`], for call pipelines already
/// built as tower stacks. The inner service owns request-target
/// construction; the layer owns coordination.
pub struct ReplayLayer {
    coordinator: RefreshCoordinator,
    policy: RefreshPolicy,
    session: Arc<dyn IdentitySource>,
    durable: Option<Arc<dyn IdentitySource>>,
    refresh: RefreshFn,
}

impl ReplayLayer {
    pub fn new<F>(
        coordinator: RefreshCoordinator,
        policy: RefreshPolicy,
        session: Arc<dyn IdentitySource>,
        refresh: F,
    ) -> Self
    where
        F: Fn(Subject) -> BoxFuture<'static, Result<(), CallError>> + Send + Sync + 'static,
    {
        Self { coordinator, policy, session, durable: None, refresh: Arc::new(refresh) }
    }

    /// Durable fallback identity source, consulted only when the session
    /// holds no subject.
    pub fn durable_identity(mut self, source: Arc<dyn IdentitySource>) -> Self {
        self.durable = Some(source);
        self
    }
}

impl Clone for ReplayLayer {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            policy: self.policy.clone(),
            session: self.session.clone(),
            durable: self.durable.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

/// Replay service produced by [`ReplayLayer`].
#[derive(Clone)]
pub struct ReplayService<S> {
    inner: S,
    layer: ReplayLayer,
}

impl<S> Service<CallDescriptor> for ReplayService<S>
where
    S: Service<CallDescriptor, Response = ApiResponse, Error = CallError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = ApiResponse;
    type Error = CallError;
    type Future = BoxFuture<'static, Result<ApiResponse, CallError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), CallError>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: CallDescriptor) -> Self::Future {
        let layer = self.layer.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            let mut descriptor = req;
            loop {
                let err = match inner.call(descriptor.clone()).await {
                    Ok(response) => return Ok(response),
                    Err(err) => err,
                };
                if !layer.policy.should_attempt_refresh(&err, &descriptor) {
                    return Err(err);
                }

                let session = Arc::clone(&layer.session);
                let durable = layer.durable.clone();
                let refresh = Arc::clone(&layer.refresh);
                let refreshed = layer
                    .coordinator
                    .coordinate(move || async move {
                        let subject = resolve_subject(&session, durable.as_ref())
                            .ok_or(RefreshError::NoIdentity)?;
                        refresh(subject).await?;
                        Ok(())
                    })
                    .await;
                if !refreshed {
                    return Err(err);
                }
                descriptor = descriptor.into_replay();
            }
        })
    }
}

impl<S> Layer<S> for ReplayLayer {
    type Service = ReplayService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ReplayService { inner, layer: self.clone() }
    }
}
