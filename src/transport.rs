//! Outbound collaborator: the literal backend calls
//!
//! The dispatcher never touches a socket itself. Implementations of
//! [`Transport`] map whatever HTTP stack the application uses onto the
//! envelope types: a structured [`ApiResponse`] on success,
//! [`CallError::Http`] carrying the backend's failure envelope verbatim, or
//! [`CallError::Transport`] when no usable response was received at all.
//!
//! The transport receives only the built request (method, target, body),
//! never the descriptor, so coordination metadata such as the replay flag
//! stays out of its reach.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::descriptor::Method;
use crate::error::CallError;
use crate::identity::Subject;
use crate::response::ApiResponse;

/// Performs the literal backend calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the backend's envelope.
    async fn send(
        &self,
        method: Method,
        target: &Url,
        body: Option<&Value>,
    ) -> Result<ApiResponse, CallError>;

    /// Request a credential refresh for `subject`, typically against a
    /// dedicated credentials route.
    ///
    /// The boolean outcome is all the coordinator consumes; any payload the
    /// endpoint returns is discarded.
    async fn refresh(&self, subject: &Subject) -> Result<(), CallError>;
}
