//! Typed namespaces over the persistent client store.
//!
//! Every accessor is best-effort: storage and serialization failures are
//! logged and degrade to the namespace's empty value instead of failing the
//! caller.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use shopdesk_core::CredentialPair;
use shopdesk_domain::{
    PermissionAuditEntry, PermissionCacheEntry, SessionUser, Theme, prepend_audit_entry,
};
use tracing::warn;

use crate::KeyValueStore;

/// Storage key of the bearer access token.
pub const TOKEN_KEY: &str = "admin_token";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "admin_refresh_token";
/// Storage key of the cached user payload.
pub const USER_KEY: &str = "admin_user";
/// Storage key of the theme preference.
pub const THEME_KEY: &str = "admin_theme";
/// Storage key of the permission cache snapshot.
pub const PERMISSION_CACHE_KEY: &str = "admin_permissions_cache";
/// Storage key of the permission audit log.
pub const PERMISSION_AUDIT_KEY: &str = "admin_permission_audit_log";

/// Typed access to the client store namespaces.
#[derive(Clone)]
pub struct ClientStorage {
    store: Arc<dyn KeyValueStore>,
}

impl ClientStorage {
    /// Creates typed storage over a key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns the stored access token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.read_text(TOKEN_KEY)
    }

    /// Replaces the stored access token.
    pub fn set_token(&self, token: &str) {
        self.write_text(TOKEN_KEY, token);
    }

    /// Removes the stored access token.
    pub fn clear_token(&self) {
        self.remove(TOKEN_KEY);
    }

    /// Returns the stored refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read_text(REFRESH_TOKEN_KEY)
    }

    /// Replaces the stored refresh token.
    pub fn set_refresh_token(&self, token: &str) {
        self.write_text(REFRESH_TOKEN_KEY, token);
    }

    /// Removes the stored refresh token.
    pub fn clear_refresh_token(&self) {
        self.remove(REFRESH_TOKEN_KEY);
    }

    /// Persists a freshly minted credential pair.
    ///
    /// A pair without refresh token keeps the previously stored one.
    pub fn store_credentials(&self, credentials: &CredentialPair) {
        self.set_token(credentials.access_token());
        if let Some(refresh_token) = credentials.refresh_token() {
            self.set_refresh_token(refresh_token);
        }
    }

    /// Returns the cached user.
    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        self.read_json::<Value>(USER_KEY).map(SessionUser::new)
    }

    /// Replaces the cached user.
    pub fn set_user(&self, user: &SessionUser) {
        self.write_json(USER_KEY, user);
    }

    /// Removes the cached user.
    pub fn clear_user(&self) {
        self.remove(USER_KEY);
    }

    /// Returns the theme preference, `Light` when unset or unreadable.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.read_text(THEME_KEY)
            .and_then(|value| Theme::from_str(&value).ok())
            .unwrap_or_default()
    }

    /// Replaces the theme preference.
    pub fn set_theme(&self, theme: Theme) {
        self.write_text(THEME_KEY, theme.as_str());
    }

    /// Removes the theme preference; reads fall back to `Light`.
    pub fn clear_theme(&self) {
        self.remove(THEME_KEY);
    }

    /// Returns the permission cache snapshot.
    #[must_use]
    pub fn permission_cache(&self) -> Option<PermissionCacheEntry> {
        self.read_json(PERMISSION_CACHE_KEY)
    }

    /// Replaces the permission cache snapshot.
    pub fn set_permission_cache(&self, entry: &PermissionCacheEntry) {
        self.write_json(PERMISSION_CACHE_KEY, entry);
    }

    /// Removes the permission cache snapshot.
    pub fn clear_permission_cache(&self) {
        self.remove(PERMISSION_CACHE_KEY);
    }

    /// Returns the audit log, newest first.
    #[must_use]
    pub fn audit_log(&self) -> Vec<PermissionAuditEntry> {
        self.read_json(PERMISSION_AUDIT_KEY).unwrap_or_default()
    }

    /// Prepends one entry to the audit log, evicting the oldest overflow.
    pub fn add_audit_entry(&self, entry: PermissionAuditEntry) {
        let mut log = self.audit_log();
        prepend_audit_entry(&mut log, entry);
        self.write_json(PERMISSION_AUDIT_KEY, &log);
    }

    /// Empties the audit log.
    pub fn clear_audit_log(&self) {
        self.remove(PERMISSION_AUDIT_KEY);
    }

    /// Clears the session namespaces: tokens, cached user and permission cache.
    pub fn clear_session(&self) {
        self.clear_token();
        self.clear_refresh_token();
        self.clear_user();
        self.clear_permission_cache();
    }

    fn read_text(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|value| !value.trim().is_empty()),
            Err(error) => {
                warn!(key, error = %error, "client storage read failed");
                None
            }
        }
    }

    fn write_text(&self, key: &str, value: &str) {
        if let Err(error) = self.store.set(key, value) {
            warn!(key, error = %error, "client storage write failed");
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_text(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, error = %error, "ignoring unreadable client storage value");
                None
            }
        }
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.write_text(key, &raw),
            Err(error) => warn!(key, error = %error, "client storage value is not serializable"),
        }
    }

    fn remove(&self, key: &str) {
        if let Err(error) = self.store.remove(key) {
            warn!(key, error = %error, "client storage remove failed");
        }
    }
}
