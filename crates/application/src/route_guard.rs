//! Navigation decisions for permission-gated console routes.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::{AuthorizationGate, DenialContext, missing_requirements};

/// Route anonymous users are sent to.
pub const LOGIN_ROUTE: &str = "/login";
/// Route users land on after a denial or a login without a remembered target.
pub const LANDING_ROUTE: &str = "/";
/// Message surfaced when a route is denied.
pub const ROUTE_DENIED_MESSAGE: &str = "Access denied for this page.";
/// Source tag recorded for route denials.
pub const ROUTE_GUARD_SOURCE: &str = "route-guard";

/// Requirements of one console route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequirement {
    /// Route path.
    pub path: &'static str,
    /// Permissions required to render the route.
    pub permissions: &'static [&'static str],
    /// Roles required to render the route.
    pub roles: &'static [&'static str],
}

const fn route(path: &'static str, permissions: &'static [&'static str]) -> RouteRequirement {
    RouteRequirement {
        path,
        permissions,
        roles: &[],
    }
}

/// Console routes and what they require. The first entry is the landing route.
pub const CONSOLE_ROUTES: &[RouteRequirement] = &[
    route(LANDING_ROUTE, &[]),
    route("/users", &["users.view"]),
    route("/roles", &["roles.view"]),
    route("/permissions", &["permissions.show"]),
    route("/permission-matrix", &["permissions.show"]),
];

/// Resolves a path against the console route table; unknown paths resolve to the landing route.
#[must_use]
pub fn resolve_route(path: &str) -> &'static RouteRequirement {
    let normalized = match path.trim_end_matches('/') {
        "" => LANDING_ROUTE,
        trimmed => trimmed,
    };

    CONSOLE_ROUTES
        .iter()
        .find(|route| route.path == normalized)
        .unwrap_or(&CONSOLE_ROUTES[0])
}

/// Where to go after a successful login: the remembered location, else the landing route.
#[must_use]
pub fn post_login_destination(from: Option<&str>) -> String {
    match from.map(str::trim) {
        Some(from) if !from.is_empty() && from != LOGIN_ROUTE => from.to_owned(),
        _ => LANDING_ROUTE.to_owned(),
    }
}

/// Outcome of guarding one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still settling; show a neutral placeholder.
    Loading,
    /// Nobody is signed in; go to the login route and come back to `from` afterwards.
    RedirectToLogin {
        /// Originally requested location.
        from: String,
    },
    /// Signed in but missing requirements; go to the landing route.
    RedirectToLanding,
    /// Render the protected content.
    Render,
}

/// Route guard; remembers which denials it already reported.
pub struct RouteGuard {
    gate: AuthorizationGate,
    reported_denials: Mutex<BTreeSet<String>>,
}

impl RouteGuard {
    /// Creates a guard with an empty denial memory.
    #[must_use]
    pub fn new(gate: AuthorizationGate) -> Self {
        Self {
            gate,
            reported_denials: Mutex::new(BTreeSet::new()),
        }
    }

    /// Guards navigation to a console route path.
    pub fn guard(&self, path: &str) -> GuardDecision {
        let route = resolve_route(path);
        self.evaluate(path, route.permissions, route.roles)
    }

    /// Guards navigation to `path` with explicit requirements.
    pub fn evaluate<S: AsRef<str>>(
        &self,
        path: &str,
        permissions: &[S],
        roles: &[S],
    ) -> GuardDecision {
        let snapshot = self.gate.snapshot();
        if snapshot.loading() {
            return GuardDecision::Loading;
        }

        if !snapshot.is_authenticated() {
            debug!(path, "redirecting anonymous navigation to login");
            return GuardDecision::RedirectToLogin {
                from: path.to_owned(),
            };
        }

        let access = snapshot.access();
        if access.permits(permissions) && access.holds_roles(roles) {
            return GuardDecision::Render;
        }

        let denial_key = format!("{path}:{}:{}", join(permissions), join(roles));
        let first_report = self
            .reported_denials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(denial_key);

        if first_report {
            let missing = missing_requirements(access, permissions, roles);
            self.gate.assert_permission(
                missing.as_slice(),
                &DenialContext {
                    denied_message: ROUTE_DENIED_MESSAGE.to_owned(),
                    action: format!("route:{path}"),
                    source: ROUTE_GUARD_SOURCE.to_owned(),
                },
            );
        }

        GuardDecision::RedirectToLanding
    }
}

fn join<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|value| value.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}
