use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of entries kept in the permission audit log.
pub const AUDIT_LOG_CAPACITY: usize = 200;

/// How long a permission cache snapshot stays usable, in milliseconds.
pub const PERMISSION_CACHE_TTL_MS: i64 = 5 * 60 * 1000;

/// Fallback snapshot of the last known permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCacheEntry {
    /// Permission names at snapshot time.
    pub permissions: Vec<String>,
    /// Snapshot time in epoch milliseconds.
    pub cached_at: i64,
}

impl PermissionCacheEntry {
    /// Creates a snapshot taken at `now_ms`.
    #[must_use]
    pub fn new(permissions: Vec<String>, now_ms: i64) -> Self {
        Self {
            permissions,
            cached_at: now_ms,
        }
    }

    /// Returns whether the snapshot is still inside its validity window.
    #[must_use]
    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        self.cached_at > 0 && now_ms.saturating_sub(self.cached_at) <= PERMISSION_CACHE_TTL_MS
    }

    /// Returns the cached permissions, or nothing once the snapshot expired.
    #[must_use]
    pub fn permissions_at(&self, now_ms: i64) -> &[String] {
        if self.is_fresh_at(now_ms) {
            self.permissions.as_slice()
        } else {
            &[]
        }
    }
}

/// One recorded permission denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionAuditEntry {
    /// Denial time in RFC3339.
    pub timestamp: String,
    /// Identifier of the user that was denied, if known.
    pub user_id: Option<String>,
    /// Email of the user that was denied, if known.
    pub user_email: Option<String>,
    /// Requirements that were not satisfied.
    pub permissions: Vec<String>,
    /// Action tag, e.g. `users.delete` or `route:/roles`.
    pub action: String,
    /// Where the check ran, e.g. `ui` or `route-guard`.
    pub source: String,
}

/// Prepends `entry` to a newest-first log and evicts the oldest overflow.
pub fn prepend_audit_entry(log: &mut Vec<PermissionAuditEntry>, entry: PermissionAuditEntry) {
    log.insert(0, entry);
    log.truncate(AUDIT_LOG_CAPACITY);
}

/// Groups permission records by the prefix before the first `.` of their name.
///
/// Records without a usable name land in `General`.
#[must_use]
pub fn group_permissions(permissions: &[Value]) -> BTreeMap<String, Vec<Value>> {
    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for permission in permissions {
        let group = permission
            .get("name")
            .and_then(Value::as_str)
            .and_then(|name| name.split('.').next())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or("General");

        groups
            .entry(group.to_owned())
            .or_default()
            .push(permission.clone());
    }

    groups
}
