//! Session lifecycle: hydration, login, logout and teardown.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use shopdesk_core::{
    AppError, AppResult, AuthMode, CredentialPair, LoginCredentials, extract_error_message,
};
use shopdesk_domain::{
    ACCESS_TOKEN_PATHS, CURRENT_USER_PATHS, LOGIN_USER_PATHS, PermissionCacheEntry,
    REFRESH_TOKEN_PATHS, SessionSnapshot, SessionUser, extract_permission_names, first_object,
    first_string,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    ApiMethod, ApiRequest, ApiTransport, ClientStorage, Notice, Notifier, UnauthorizedHandler,
};

/// Login endpoint.
pub const LOGIN_PATH: &str = "/auth/login";
/// Logout endpoint.
pub const LOGOUT_PATH: &str = "/auth/logout";
/// Who-am-I endpoint.
pub const CURRENT_USER_PATH: &str = "/auth/me";

/// Notice shown after a successful login.
pub const LOGIN_SUCCESS_MESSAGE: &str = "Welcome back";
/// Fallback notice when a login failure carries no readable message.
pub const LOGIN_FAILURE_MESSAGE: &str = "Unable to login.";
/// Notice shown after logout.
pub const LOGOUT_MESSAGE: &str = "Logged out successfully";
/// Notice shown when the pipeline tears the session down.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The session is authenticated.
    Ok,
    /// The attempt failed; `message` was already surfaced to the user.
    Failed {
        /// Human-readable failure.
        message: String,
    },
}

impl LoginOutcome {
    /// Returns whether the login succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Shared session state handed to the gate, the guard and the pipeline.
pub struct SessionContext {
    state: watch::Sender<SessionSnapshot>,
    storage: ClientStorage,
    notifier: Arc<dyn Notifier>,
}

impl SessionContext {
    /// Creates an uninitialized session context.
    #[must_use]
    pub fn new(storage: ClientStorage, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::uninitialized());
        Self {
            state,
            storage,
            notifier,
        }
    }

    /// Returns a copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribes to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Returns the client storage.
    #[must_use]
    pub fn storage(&self) -> &ClientStorage {
        &self.storage
    }

    /// Surfaces a notice to the user.
    pub fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Clears credentials, cached user and permission cache, then publishes
    /// an anonymous snapshot. `notify` surfaces the session-expired notice.
    pub fn reset_session(&self, notify: bool) {
        self.storage.clear_session();
        self.publish(SessionSnapshot::anonymous());
        if notify {
            self.notify(Notice::error(SESSION_EXPIRED_MESSAGE));
        }
    }

    pub(crate) fn publish(&self, snapshot: SessionSnapshot) {
        info!(
            phase = snapshot.phase().as_str(),
            user_id = %snapshot
                .user()
                .and_then(SessionUser::id)
                .unwrap_or_default(),
            "session state changed"
        );
        self.state.send_replace(snapshot);
    }

    /// Derives, persists and publishes an authenticated snapshot.
    pub(crate) fn establish(&self, payload: Value) -> SessionSnapshot {
        let now_ms = Utc::now().timestamp_millis();
        let cached = self
            .storage
            .permission_cache()
            .map(|entry| entry.permissions_at(now_ms).to_vec())
            .unwrap_or_default();

        let user = SessionUser::new(payload);
        let live_permissions = extract_permission_names(user.payload())
            .into_iter()
            .collect();
        let snapshot = SessionSnapshot::authenticated(user, &cached);

        if let Some(user) = snapshot.user() {
            self.storage.set_user(user);
        }
        self.storage
            .set_permission_cache(&PermissionCacheEntry::new(live_permissions, now_ms));
        self.publish(snapshot.clone());
        snapshot
    }
}

impl UnauthorizedHandler for SessionContext {
    fn on_unauthorized(&self) {
        warn!("api rejected the session; tearing down");
        self.reset_session(true);
    }
}

/// Application service driving the session state machine.
#[derive(Clone)]
pub struct SessionService {
    context: Arc<SessionContext>,
    transport: Arc<dyn ApiTransport>,
}

impl SessionService {
    /// Creates a session service.
    #[must_use]
    pub fn new(context: Arc<SessionContext>, transport: Arc<dyn ApiTransport>) -> Self {
        Self { context, transport }
    }

    /// Returns the shared session context.
    #[must_use]
    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Returns a copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.context.snapshot()
    }

    /// Restores the session from stored credentials. Failures tear the
    /// session down silently.
    pub async fn hydrate(&self) -> SessionSnapshot {
        if self.context.storage().token().is_none() {
            self.context.publish(SessionSnapshot::anonymous());
            return self.context.snapshot();
        }

        self.context.publish(SessionSnapshot::hydrating());
        match self.fetch_current_user().await {
            Ok(user) => self.context.establish(user),
            Err(error) => {
                warn!(error = %error, "session hydration failed");
                self.context.reset_session(false);
                self.context.snapshot()
            }
        }
    }

    /// Signs in and surfaces the outcome as a notice.
    pub async fn login(&self, credentials: &LoginCredentials) -> LoginOutcome {
        match self.try_login(credentials).await {
            Ok(snapshot) => {
                info!(
                    email = credentials.email(),
                    roles = snapshot.roles().len(),
                    "login succeeded"
                );
                self.context.notify(Notice::success(LOGIN_SUCCESS_MESSAGE));
                LoginOutcome::Ok
            }
            Err(error) => {
                let message = extract_error_message(&error, LOGIN_FAILURE_MESSAGE);
                warn!(email = credentials.email(), error = %error, "login failed");
                self.context.notify(Notice::error(message.clone()));
                LoginOutcome::Failed { message }
            }
        }
    }

    /// Signs out. The server call is best-effort; local teardown always runs.
    pub async fn logout(&self) {
        let request = ApiRequest::new(ApiMethod::Post, LOGOUT_PATH).exempt_from_auth();
        if let Err(error) = self.transport.send(request).await {
            debug!(error = %error, "ignoring logout failure");
        }

        self.context.reset_session(false);
        self.context.notify(Notice::success(LOGOUT_MESSAGE));
    }

    /// Tears the session down; see [`SessionContext::reset_session`].
    pub fn reset_session(&self, notify: bool) {
        self.context.reset_session(notify);
    }

    async fn try_login(&self, credentials: &LoginCredentials) -> AppResult<SessionSnapshot> {
        if self.transport.auth_mode() == AuthMode::Sanctum {
            self.transport.request_csrf_cookie().await?;
        }

        let body = serde_json::to_value(credentials).map_err(|error| {
            AppError::Internal(format!("failed to encode login request: {error}"))
        })?;
        let response = self
            .transport
            .send(ApiRequest::post(LOGIN_PATH, body).exempt_from_auth())
            .await?;

        let access_token = first_string(&response, ACCESS_TOKEN_PATHS)
            .ok_or_else(|| AppError::Unauthorized("No access token returned by API".to_owned()))?;
        let issued = CredentialPair::new(
            access_token,
            first_string(&response, REFRESH_TOKEN_PATHS),
        )?;
        self.context.storage().store_credentials(&issued);

        let user = match first_object(&response, LOGIN_USER_PATHS) {
            Some(user) => user,
            None => match self.fetch_current_user().await {
                Ok(user) => user,
                Err(error) => {
                    self.context.storage().clear_session();
                    return Err(error);
                }
            },
        };

        Ok(self.context.establish(user))
    }

    async fn fetch_current_user(&self) -> AppResult<Value> {
        let body = self
            .transport
            .send(ApiRequest::get(CURRENT_USER_PATH))
            .await?;

        first_object(&body, CURRENT_USER_PATHS).ok_or_else(|| {
            AppError::Internal("current user response did not contain a user object".to_owned())
        })
    }
}
