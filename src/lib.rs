#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Authgate
//!
//! Single-flight credential refresh and bounded replay for authenticated
//! async API clients.
//!
//! When a backend starts answering 401 because the session credential
//! expired, every request in flight fails at roughly the same moment. The
//! naive fix, each caller refreshing and retrying on its own, produces a
//! refresh storm, and on a hostile server an infinite retry loop. This
//! crate is the coordination layer that prevents both:
//!
//! - **[`RefreshPolicy`]** decides, purely, whether a failed call may
//!   trigger a refresh at all.
//! - **[`RefreshCoordinator`]** guarantees at most one refresh call runs at
//!   a time; concurrent callers park on the one in flight and share its
//!   outcome.
//! - **[`Dispatcher`]** sends a call and, after a successful refresh,
//!   replays it exactly once. Failed refreshes surface the call's original
//!   failure untouched.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//! use url::Url;
//!
//! use authgate::{
//!     ApiResponse, CallDescriptor, CallError, Dispatcher, Method, RefreshCoordinator,
//!     SessionIdentity, Subject, Transport,
//! };
//!
//! struct Backend;
//!
//! #[async_trait]
//! impl Transport for Backend {
//!     async fn send(
//!         &self,
//!         _method: Method,
//!         _target: &Url,
//!         _body: Option<&Value>,
//!     ) -> Result<ApiResponse, CallError> {
//!         Ok(ApiResponse {
//!             status: 200,
//!             heading: "OK".into(),
//!             message: "wallet fetched".into(),
//!             data: json!({ "balance": 1250 }),
//!         })
//!     }
//!
//!     async fn refresh(&self, _subject: &Subject) -> Result<(), CallError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = SessionIdentity::new();
//!     session.set(Subject::new("user-1"));
//!
//!     let dispatcher = Dispatcher::builder()
//!         .base_url("https://api.example.com")
//!         .transport(Arc::new(Backend))
//!         .coordinator(RefreshCoordinator::new())
//!         .session_identity(Arc::new(session))
//!         .build()
//!         .unwrap();
//!
//!     let call = CallDescriptor::new(Method::Get, ["wallet", "balance"]);
//!     let response = dispatcher.dispatch(call).await.unwrap();
//!     assert_eq!(response.status, 200);
//! }
//! ```
//!
//! Share one [`RefreshCoordinator`] across every dispatcher of an execution
//! context; that shared gate is what turns N concurrent authorization
//! failures into a single refresh call.

pub mod coordinator;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod policy;
pub mod prelude;
pub mod response;
pub mod transport;

// Re-exports
pub use coordinator::{CoordinatorConfig, CoordinatorConfigError, RefreshCoordinator, RefreshError};
pub use descriptor::{CallDescriptor, Method, TargetError};
pub use dispatcher::{BuildError, Dispatcher, DispatcherBuilder, ReplayLayer, ReplayService};
pub use error::CallError;
pub use identity::{IdentitySource, SessionIdentity, Subject};
pub use policy::{RefreshPolicy, AUTHORIZATION_EXPIRED};
pub use response::ApiResponse;
pub use transport::Transport;
