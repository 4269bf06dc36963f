//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod listing;
mod payload;
mod preferences;
mod security;
mod session;
mod user;

pub use access::{
    AccessProfile, NAME_KEYS, ROLE_FIELDS, SUPER_ADMIN_ROLE, WILDCARD_PERMISSION, entry_name,
    extract_permission_names, extract_role_names, is_super_admin, normalize_access_key,
};
pub use listing::{
    COLLECTION_PATHS, META_CONTAINERS, ListQuery, Page, PageMeta, normalize_paginated,
};
pub use payload::{
    ACCESS_TOKEN_PATHS, CURRENT_USER_PATHS, LOGIN_USER_PATHS, PayloadPath, RECORD_PATHS,
    REFRESH_TOKEN_PATHS, first_object, first_string, lookup, unwrap_record,
};
pub use preferences::Theme;
pub use security::{
    AUDIT_LOG_CAPACITY, PERMISSION_CACHE_TTL_MS, PermissionAuditEntry, PermissionCacheEntry,
    group_permissions, prepend_audit_entry,
};
pub use session::{SessionPhase, SessionSnapshot};
pub use user::SessionUser;
