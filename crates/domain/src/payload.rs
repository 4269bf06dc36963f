//! Ordered extraction strategies for loosely shaped API envelopes.
//!
//! The backend has shipped several response shapes over time. Each table
//! below lists the JSON paths tried in order together with the purpose of
//! the lookup; the first path holding a usable value wins.

use serde_json::Value;

/// One candidate location inside a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadPath {
    /// Object keys walked from the body root.
    pub path: &'static [&'static str],
    /// What the value at this location is used for.
    pub purpose: &'static str,
}

pub(crate) const fn path(path: &'static [&'static str], purpose: &'static str) -> PayloadPath {
    PayloadPath { path, purpose }
}

/// Access token locations in login and refresh responses.
pub const ACCESS_TOKEN_PATHS: &[PayloadPath] = &[
    path(&["access_token"], "access token at top level"),
    path(&["token"], "legacy token at top level"),
    path(&["accessToken"], "camelCase access token at top level"),
    path(&["data", "access_token"], "access token in data envelope"),
    path(&["data", "token"], "legacy token in data envelope"),
    path(&["data", "accessToken"], "camelCase access token in data envelope"),
    path(&["result", "access_token"], "access token in result envelope"),
    path(&["result", "token"], "legacy token in result envelope"),
    path(&["result", "accessToken"], "camelCase access token in result envelope"),
];

/// Refresh token locations in login and refresh responses.
pub const REFRESH_TOKEN_PATHS: &[PayloadPath] = &[
    path(&["refresh_token"], "refresh token at top level"),
    path(&["refreshToken"], "camelCase refresh token at top level"),
    path(&["data", "refresh_token"], "refresh token in data envelope"),
    path(&["data", "refreshToken"], "camelCase refresh token in data envelope"),
    path(&["result", "refresh_token"], "refresh token in result envelope"),
    path(&["result", "refreshToken"], "camelCase refresh token in result envelope"),
];

/// Embedded user locations in login responses.
pub const LOGIN_USER_PATHS: &[PayloadPath] = &[
    path(&["user"], "user at top level"),
    path(&["data", "user"], "user in data envelope"),
    path(&["result", "user"], "user in result envelope"),
];

/// User locations in who-am-I responses; the body itself is the last resort.
pub const CURRENT_USER_PATHS: &[PayloadPath] = &[
    path(&["data"], "user in data envelope"),
    path(&["user"], "user under user key"),
    path(&[], "bare user body"),
];

/// Single-record locations in detail, create and update responses.
pub const RECORD_PATHS: &[PayloadPath] = &[
    path(&["data"], "record in data envelope"),
    path(&[], "bare record body"),
];

/// Resolves a path against a JSON body.
#[must_use]
pub fn lookup<'a>(body: &'a Value, path: &PayloadPath) -> Option<&'a Value> {
    path.path
        .iter()
        .try_fold(body, |current, key| current.get(*key))
}

/// Returns the first non-blank string found along `paths`.
#[must_use]
pub fn first_string(body: &Value, paths: &[PayloadPath]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| lookup(body, path))
        .filter_map(Value::as_str)
        .find(|value| !value.trim().is_empty())
        .map(ToOwned::to_owned)
}

/// Returns the first JSON object found along `paths`.
#[must_use]
pub fn first_object(body: &Value, paths: &[PayloadPath]) -> Option<Value> {
    paths
        .iter()
        .filter_map(|path| lookup(body, path))
        .find(|value| value.is_object())
        .cloned()
}

/// Unwraps a single record from its envelope, keeping non-object bodies as-is.
#[must_use]
pub fn unwrap_record(body: Value) -> Value {
    match first_object(&body, RECORD_PATHS) {
        Some(record) => record,
        None => body,
    }
}
