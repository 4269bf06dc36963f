//! Role and permission derivation from raw user payloads.

use std::collections::BTreeSet;

use serde_json::{Value, json};

/// Normalized name of the role that bypasses every permission check.
pub const SUPER_ADMIN_ROLE: &str = "superadmin";

/// Permission that grants everything.
pub const WILDCARD_PERMISSION: &str = "*";

/// User fields that may carry role entries, in lookup order.
pub const ROLE_FIELDS: &[&str] = &["roles", "role", "role_names", "roles_name", "assigned_roles"];

/// Keys that may name a role or permission object, in lookup order.
pub const NAME_KEYS: &[&str] = &["name", "slug", "label", "title"];

/// Case-folds and strips everything but ASCII letters and digits.
#[must_use]
pub fn normalize_access_key(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Resolves a role or permission entry to its name.
///
/// Strings are names themselves; objects are named by the first non-empty
/// string under `name`, `slug`, `label` or `title`.
#[must_use]
pub fn entry_name(entry: &Value) -> Option<String> {
    let name = match entry {
        Value::String(name) => Some(name.as_str()),
        Value::Object(object) => NAME_KEYS
            .iter()
            .filter_map(|key| object.get(*key))
            .filter_map(Value::as_str)
            .find(|name| !name.is_empty()),
        _ => None,
    };

    name.filter(|name| !name.is_empty()).map(ToOwned::to_owned)
}

fn entries(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(Value::Bool(false)) => Vec::new(),
        Some(Value::String(text)) if text.is_empty() => Vec::new(),
        Some(other) => vec![other],
    }
}

/// Collects role names from every known role field, keeping first occurrences.
#[must_use]
pub fn extract_role_names(user: &Value) -> Vec<String> {
    let mut names = Vec::new();
    for field in ROLE_FIELDS {
        for entry in entries(user.get(*field)) {
            if let Some(name) = entry_name(entry)
                && !names.contains(&name)
            {
                names.push(name);
            }
        }
    }

    names
}

/// Collects direct permissions plus every permission nested under `roles`.
#[must_use]
pub fn extract_permission_names(user: &Value) -> BTreeSet<String> {
    let direct = entries(user.get("permissions"))
        .into_iter()
        .filter_map(entry_name);

    let inherited = entries(user.get("roles"))
        .into_iter()
        .flat_map(|role| entries(role.get("permissions")))
        .filter_map(entry_name);

    direct.chain(inherited).collect()
}

/// Returns whether the payload describes a super-admin.
#[must_use]
pub fn is_super_admin(user: &Value) -> bool {
    if user.get("is_super_admin").and_then(Value::as_bool) == Some(true) {
        return true;
    }

    extract_role_names(user)
        .iter()
        .any(|role| normalize_access_key(role) == SUPER_ADMIN_ROLE)
}

/// Roles, permissions and super-admin flag derived from one user payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessProfile {
    /// Role names in first-seen order.
    pub roles: Vec<String>,
    /// Deduplicated permission names.
    pub permissions: BTreeSet<String>,
    /// Whether every permission check passes.
    pub is_super_admin: bool,
}

impl AccessProfile {
    /// Derives the access profile of a raw user payload.
    #[must_use]
    pub fn from_user(user: &Value) -> Self {
        Self {
            roles: extract_role_names(user),
            permissions: extract_permission_names(user),
            is_super_admin: is_super_admin(user),
        }
    }

    /// Renders the profile as a minimal, already-normalized user payload.
    #[must_use]
    pub fn as_user_payload(&self) -> Value {
        json!({
            "roles": self.roles,
            "permissions": self.permissions,
            "is_super_admin": self.is_super_admin,
        })
    }

    /// Returns whether every required permission is satisfied.
    ///
    /// Super-admins, wildcard holders and empty requirements always pass.
    #[must_use]
    pub fn permits<S: AsRef<str>>(&self, required: &[S]) -> bool {
        if self.is_super_admin || self.permissions.contains(WILDCARD_PERMISSION) {
            return true;
        }

        required
            .iter()
            .all(|permission| self.permissions.contains(permission.as_ref()))
    }

    /// Returns whether every required role is held, comparing normalized names.
    #[must_use]
    pub fn holds_roles<S: AsRef<str>>(&self, required: &[S]) -> bool {
        if self.is_super_admin {
            return true;
        }

        let held: BTreeSet<String> = self
            .roles
            .iter()
            .map(|role| normalize_access_key(role))
            .collect();

        required
            .iter()
            .all(|role| held.contains(&normalize_access_key(role.as_ref())))
    }
}
