//! Client-side permission checks and denial auditing.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use shopdesk_domain::{AccessProfile, PermissionAuditEntry, SessionSnapshot, SessionUser};
use tracing::warn;

use crate::{Notice, SessionContext};

/// Message surfaced when a denial carries no message of its own.
pub const DEFAULT_DENIED_MESSAGE: &str = "You do not have permission for this action.";
/// Action tag recorded when the caller names none.
pub const DEFAULT_DENIAL_ACTION: &str = "unknown";
/// Source tag recorded when the caller names none.
pub const DEFAULT_DENIAL_SOURCE: &str = "ui";

/// How a denial is reported and recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenialContext {
    /// Text surfaced to the user.
    pub denied_message: String,
    /// Action tag, e.g. `users.delete`.
    pub action: String,
    /// Where the check ran.
    pub source: String,
}

impl DenialContext {
    /// Creates a denial context for an action with the default message and source.
    #[must_use]
    pub fn for_action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }
}

impl Default for DenialContext {
    fn default() -> Self {
        Self {
            denied_message: DEFAULT_DENIED_MESSAGE.to_owned(),
            action: DEFAULT_DENIAL_ACTION.to_owned(),
            source: DEFAULT_DENIAL_SOURCE.to_owned(),
        }
    }
}

/// Lists the unmet subset of `permissions` and `roles`; roles are reported as `role:<name>`.
#[must_use]
pub fn missing_requirements<S: AsRef<str>>(
    access: &AccessProfile,
    permissions: &[S],
    roles: &[S],
) -> Vec<String> {
    let missing_permissions = permissions
        .iter()
        .map(|permission| permission.as_ref())
        .filter(|permission| !access.permits(&[*permission]))
        .map(ToOwned::to_owned);
    let missing_roles = roles
        .iter()
        .map(|role| role.as_ref())
        .filter(|role| !access.holds_roles(&[*role]))
        .map(|role| format!("role:{role}"));

    missing_permissions.chain(missing_roles).collect()
}

/// Permission checks against the current session.
#[derive(Clone)]
pub struct AuthorizationGate {
    context: Arc<SessionContext>,
}

impl AuthorizationGate {
    /// Creates a gate over the shared session context.
    #[must_use]
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self { context }
    }

    /// Returns a copy of the session the gate decides on.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.context.snapshot()
    }

    /// Returns whether every required permission is held. No side effects.
    #[must_use]
    pub fn can<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.context.snapshot().access().permits(required)
    }

    /// Returns whether every required role is held. No side effects.
    #[must_use]
    pub fn has_role<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.context.snapshot().access().holds_roles(required)
    }

    /// Lists the requirements the current session does not meet.
    #[must_use]
    pub fn missing_requirements<S: AsRef<str>>(
        &self,
        permissions: &[S],
        roles: &[S],
    ) -> Vec<String> {
        missing_requirements(self.context.snapshot().access(), permissions, roles)
    }

    /// Checks `required`; on denial records an audit entry and surfaces
    /// `denial.denied_message`.
    ///
    /// Every user-visible or audited denial goes through here.
    pub fn assert_permission<S: AsRef<str>>(
        &self,
        required: &[S],
        denial: &DenialContext,
    ) -> bool {
        if self.can(required) {
            return true;
        }

        let permissions = required
            .iter()
            .map(|permission| permission.as_ref().to_owned())
            .collect();
        self.log_denied(permissions, &denial.action, &denial.source);
        self.context.notify(Notice::error(denial.denied_message.clone()));
        false
    }

    /// Appends a denial to the audit log without notifying the user.
    pub fn log_denied(&self, permissions: Vec<String>, action: &str, source: &str) {
        let snapshot = self.context.snapshot();
        let user = snapshot.user();
        warn!(
            action,
            source,
            permissions = ?permissions,
            user_id = %user.and_then(SessionUser::id).unwrap_or_default(),
            "permission denied"
        );

        self.context.storage().add_audit_entry(PermissionAuditEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            user_id: user.and_then(SessionUser::id),
            user_email: user.and_then(SessionUser::email).map(ToOwned::to_owned),
            permissions,
            action: action.to_owned(),
            source: source.to_owned(),
        });
    }
}
