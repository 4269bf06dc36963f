//! Application services and ports.

#![forbid(unsafe_code)]

mod api_ports;
mod association_probe;
mod authorization_gate;
mod client_ports;
mod client_storage;
mod list_loader;
mod resource_service;
mod route_guard;
mod session_service;

#[cfg(test)]
mod test_support;

pub use api_ports::{ApiMethod, ApiRequest, ApiTransport, REQUEST_ID_HEADER, UnauthorizedHandler};
pub use association_probe::{
    AssociationProbe, ProbeCandidate, RETRYABLE_PROBE_STATUSES, ROLE_PERMISSION_SYNC,
    USER_ROLE_ASSIGNMENT,
};
pub use authorization_gate::{
    AuthorizationGate, DEFAULT_DENIAL_ACTION, DEFAULT_DENIAL_SOURCE, DEFAULT_DENIED_MESSAGE,
    DenialContext, missing_requirements,
};
pub use client_ports::{KeyValueStore, Notice, NoticeLevel, Notifier};
pub use client_storage::{
    ClientStorage, PERMISSION_AUDIT_KEY, PERMISSION_CACHE_KEY, REFRESH_TOKEN_KEY, THEME_KEY,
    TOKEN_KEY, USER_KEY,
};
pub use list_loader::{ListLoader, LoadOutcome};
pub use resource_service::{ResourceAction, ResourceKind, ResourceService};
pub use route_guard::{
    CONSOLE_ROUTES, GuardDecision, LANDING_ROUTE, LOGIN_ROUTE, ROUTE_DENIED_MESSAGE,
    ROUTE_GUARD_SOURCE, RouteGuard, RouteRequirement, post_login_destination, resolve_route,
};
pub use session_service::{
    CURRENT_USER_PATH, LOGIN_FAILURE_MESSAGE, LOGIN_PATH, LOGIN_SUCCESS_MESSAGE, LOGOUT_MESSAGE,
    LOGOUT_PATH, LoginOutcome, SESSION_EXPIRED_MESSAGE, SessionContext, SessionService,
};
