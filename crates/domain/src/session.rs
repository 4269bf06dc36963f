//! Session lifecycle state.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::access::AccessProfile;
use crate::user::SessionUser;

/// Lifecycle phase of the console session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Created, not yet hydrated.
    Uninitialized,
    /// Startup who-am-I call in flight.
    Hydrating,
    /// A user is signed in.
    Authenticated,
    /// Nobody is signed in.
    Anonymous,
}

impl SessionPhase {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Hydrating => "hydrating",
            Self::Authenticated => "authenticated",
            Self::Anonymous => "anonymous",
        }
    }
}

/// Whole-value view of the session; every change replaces the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    phase: SessionPhase,
    user: Option<SessionUser>,
    access: AccessProfile,
}

impl SessionSnapshot {
    /// Snapshot of a session that has not started hydrating.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::empty(SessionPhase::Uninitialized)
    }

    /// Snapshot while the startup who-am-I call is in flight.
    #[must_use]
    pub fn hydrating() -> Self {
        Self::empty(SessionPhase::Hydrating)
    }

    /// Snapshot with nobody signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::empty(SessionPhase::Anonymous)
    }

    /// Snapshot of a signed-in user.
    ///
    /// `cached_permissions` is used verbatim only when the live payload
    /// carries no permissions at all.
    #[must_use]
    pub fn authenticated(user: SessionUser, cached_permissions: &[String]) -> Self {
        let mut access = AccessProfile::from_user(user.payload());
        if access.permissions.is_empty() {
            access.permissions = cached_permissions.iter().cloned().collect();
        }

        Self {
            phase: SessionPhase::Authenticated,
            user: Some(user),
            access,
        }
    }

    fn empty(phase: SessionPhase) -> Self {
        Self {
            phase,
            user: None,
            access: AccessProfile::default(),
        }
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Returns whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    /// Returns whether no authorization decision can be made yet.
    #[must_use]
    pub fn loading(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Uninitialized | SessionPhase::Hydrating
        )
    }

    /// Returns the signed-in user.
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// Returns the raw user payload, if any.
    #[must_use]
    pub fn user_payload(&self) -> Option<&Value> {
        self.user.as_ref().map(SessionUser::payload)
    }

    /// Returns role names in first-seen order.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.access.roles.as_slice()
    }

    /// Returns the effective permission set.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.access.permissions
    }

    /// Returns whether the user bypasses permission checks.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.access.is_super_admin
    }

    /// Returns the derived access profile.
    #[must_use]
    pub fn access(&self) -> &AccessProfile {
        &self.access
    }
}
