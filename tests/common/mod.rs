//! Shared test doubles for the integration suite.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use authgate::{
    ApiResponse, CallError, Dispatcher, Method, RefreshCoordinator, SessionIdentity, Subject,
    Transport,
};

/// The 401 envelope the stub backend answers with while the credential is
/// expired.
pub fn expired_envelope() -> CallError {
    CallError::http(401, "Unauthorized", "access credential expired")
}

pub fn success_envelope() -> ApiResponse {
    ApiResponse {
        status: 200,
        heading: "OK".into(),
        message: "call succeeded".into(),
        data: json!({ "ok": true }),
    }
}

/// Backend double driven by its credential state: while expired, data calls
/// fail with the 401 envelope; a successful refresh marks it authorized and
/// data calls succeed (unless scripted otherwise). Counters record every
/// send and every refresh network call.
pub struct StubBackend {
    authorized: AtomicBool,
    refresh_ok: bool,
    refresh_delay: Duration,
    after_refresh: Option<CallError>,
    wire_down: bool,
    send_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

impl StubBackend {
    fn base(authorized: bool) -> Self {
        Self {
            authorized: AtomicBool::new(authorized),
            refresh_ok: true,
            refresh_delay: Duration::ZERO,
            after_refresh: None,
            wire_down: false,
            send_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    /// Credential already valid; calls succeed immediately.
    pub fn fresh() -> Arc<Self> {
        Arc::new(Self::base(true))
    }

    /// Credential expired; refresh succeeds instantly.
    pub fn expired() -> Arc<Self> {
        Arc::new(Self::base(false))
    }

    /// Credential expired; refresh succeeds after `delay`.
    pub fn expired_with_delay(delay: Duration) -> Arc<Self> {
        let mut backend = Self::base(false);
        backend.refresh_delay = delay;
        Arc::new(backend)
    }

    /// Credential expired and the refresh endpoint rejects every attempt.
    pub fn refresh_fails() -> Arc<Self> {
        let mut backend = Self::base(false);
        backend.refresh_ok = false;
        Arc::new(backend)
    }

    /// Refresh succeeds but data calls keep failing with the 401 envelope,
    /// the adversarial-server shape that must not loop.
    pub fn always_unauthorized() -> Arc<Self> {
        let mut backend = Self::base(false);
        backend.after_refresh = Some(expired_envelope());
        Arc::new(backend)
    }

    /// Refresh succeeds but the replay fails with `err` instead.
    pub fn replay_fails_with(err: CallError) -> Arc<Self> {
        let mut backend = Self::base(false);
        backend.after_refresh = Some(err);
        Arc::new(backend)
    }

    /// Credential valid, but every call fails with `err`.
    pub fn failing(err: CallError) -> Arc<Self> {
        let mut backend = Self::base(true);
        backend.after_refresh = Some(err);
        Arc::new(backend)
    }

    /// No response at all; every send is a transport failure.
    pub fn wire_down() -> Arc<Self> {
        let mut backend = Self::base(false);
        backend.wire_down = true;
        Arc::new(backend)
    }

    /// Expire the credential again, as a later round of the scenario.
    pub fn expire(&self) {
        self.authorized.store(false, Ordering::SeqCst);
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StubBackend {
    async fn send(
        &self,
        _method: Method,
        _target: &Url,
        _body: Option<&Value>,
    ) -> Result<ApiResponse, CallError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.wire_down {
            return Err(CallError::transport("connection refused"));
        }
        if !self.authorized.load(Ordering::SeqCst) {
            return Err(expired_envelope());
        }
        match &self.after_refresh {
            Some(err) => Err(err.clone()),
            None => Ok(success_envelope()),
        }
    }

    async fn refresh(&self, _subject: &Subject) -> Result<(), CallError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        if self.refresh_ok {
            self.authorized.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(CallError::http(401, "Unauthorized", "refresh credential rejected"))
        }
    }
}

/// Dispatcher wired to `backend` with a signed-in session.
pub fn dispatcher(backend: Arc<StubBackend>) -> Dispatcher {
    let session = SessionIdentity::new();
    session.set(Subject::new("user-1"));
    Dispatcher::builder()
        .base_url("https://api.example.com")
        .transport(backend)
        .coordinator(RefreshCoordinator::new())
        .session_identity(Arc::new(session))
        .build()
        .unwrap()
}

/// Dispatcher wired to `backend` with no identity anywhere.
pub fn dispatcher_anonymous(backend: Arc<StubBackend>) -> Dispatcher {
    Dispatcher::builder()
        .base_url("https://api.example.com")
        .transport(backend)
        .coordinator(RefreshCoordinator::new())
        .build()
        .unwrap()
}
