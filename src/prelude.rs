//! Convenient re-exports for common Authgate types.
pub use crate::{
    coordinator::{CoordinatorConfig, CoordinatorConfigError, RefreshCoordinator, RefreshError},
    descriptor::{CallDescriptor, Method, TargetError},
    dispatcher::{
        BuildError, Dispatcher, DispatcherBuilder, RefreshFn, ReplayLayer, ReplayService,
        DEFAULT_BASE_URL,
    },
    error::CallError,
    identity::{IdentitySource, SessionIdentity, Subject},
    policy::{RefreshPolicy, AUTHORIZATION_EXPIRED},
    response::ApiResponse,
    transport::Transport,
};
