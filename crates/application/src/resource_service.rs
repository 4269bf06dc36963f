//! CRUD plumbing for the console's admin resources.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use shopdesk_core::{AppError, AppResult};
use shopdesk_domain::{ListQuery, Page, normalize_paginated, unwrap_record};

use crate::{ApiRequest, ApiTransport, ROLE_PERMISSION_SYNC, USER_ROLE_ASSIGNMENT};

/// Admin resource exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Console users.
    Users,
    /// Roles.
    Roles,
    /// Permissions.
    Permissions,
    /// Catalog categories.
    Categories,
    /// Catalog products.
    Products,
    /// Customer orders.
    Orders,
}

/// Operation on a resource, used to derive permission names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    /// List or show.
    View,
    /// Create.
    Create,
    /// Update.
    Update,
    /// Delete.
    Delete,
}

impl ResourceKind {
    /// Every resource kind.
    pub const ALL: [Self; 6] = [
        Self::Users,
        Self::Roles,
        Self::Permissions,
        Self::Categories,
        Self::Products,
        Self::Orders,
    ];

    /// Returns the stable resource name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Roles => "roles",
            Self::Permissions => "permissions",
            Self::Categories => "categories",
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }

    /// Returns the collection path relative to the API base URL.
    #[must_use]
    pub fn base_path(&self) -> &'static str {
        match self {
            Self::Users => "/users",
            Self::Roles => "/roles",
            Self::Permissions => "/permissions",
            Self::Categories => "/categories",
            Self::Products => "/admin/products",
            Self::Orders => "/admin/orders",
        }
    }

    /// Returns the permission gating `action`, or `None` for ungated resources.
    #[must_use]
    pub fn permission(&self, action: ResourceAction) -> Option<String> {
        match self {
            Self::Users | Self::Roles | Self::Permissions => {}
            Self::Categories | Self::Products | Self::Orders => return None,
        }

        let verb = match (self, action) {
            (Self::Permissions, ResourceAction::View) => "show",
            (_, ResourceAction::View) => "view",
            (_, ResourceAction::Create) => "create",
            (_, ResourceAction::Update) => "update",
            (_, ResourceAction::Delete) => "delete",
        };
        Some(format!("{}.{verb}", self.as_str()))
    }

    fn record_path(&self, id: &str) -> AppResult<String> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(AppError::Validation(format!(
                "invalid {} id '{id}'",
                self.as_str()
            )));
        }

        Ok(format!("{}/{id}", self.base_path()))
    }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let name = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| AppError::Validation(format!("unknown resource '{value}'")))
    }
}

/// Application service for resource CRUD calls.
#[derive(Clone)]
pub struct ResourceService {
    transport: Arc<dyn ApiTransport>,
}

impl ResourceService {
    /// Creates a resource service over the authenticated pipeline.
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    /// Lists one page of a resource.
    pub async fn list(&self, kind: ResourceKind, query: &ListQuery) -> AppResult<Page<Value>> {
        let body = self
            .transport
            .send(ApiRequest::get(kind.base_path()).with_query(query.to_query_pairs()))
            .await?;
        Ok(normalize_paginated(&body))
    }

    /// Fetches one record.
    pub async fn get(&self, kind: ResourceKind, id: &str) -> AppResult<Value> {
        let body = self
            .transport
            .send(ApiRequest::get(kind.record_path(id)?))
            .await?;
        Ok(unwrap_record(body))
    }

    /// Creates a record.
    pub async fn create(&self, kind: ResourceKind, payload: Value) -> AppResult<Value> {
        let body = self
            .transport
            .send(ApiRequest::post(kind.base_path(), payload))
            .await?;
        Ok(unwrap_record(body))
    }

    /// Replaces a record.
    pub async fn update(&self, kind: ResourceKind, id: &str, payload: Value) -> AppResult<Value> {
        let body = self
            .transport
            .send(ApiRequest::put(kind.record_path(id)?, payload))
            .await?;
        Ok(unwrap_record(body))
    }

    /// Deletes a record.
    pub async fn delete(&self, kind: ResourceKind, id: &str) -> AppResult<()> {
        self.transport
            .send(ApiRequest::delete(kind.record_path(id)?))
            .await?;
        Ok(())
    }

    /// Moves an order to another status.
    pub async fn transition_order_status(&self, id: &str, payload: Value) -> AppResult<Value> {
        let path = format!("{}/status", ResourceKind::Orders.record_path(id)?);
        let body = self
            .transport
            .send(ApiRequest::patch(path, payload))
            .await?;
        Ok(unwrap_record(body))
    }

    /// Replaces the permissions of a role.
    pub async fn sync_role_permissions(
        &self,
        role_id: &str,
        permission_ids: &[Value],
    ) -> AppResult<Value> {
        ROLE_PERMISSION_SYNC
            .run(self.transport.as_ref(), role_id, permission_ids)
            .await
    }

    /// Replaces the roles of a user.
    pub async fn assign_user_roles(&self, user_id: &str, role_ids: &[Value]) -> AppResult<Value> {
        USER_ROLE_ASSIGNMENT
            .run(self.transport.as_ref(), user_id, role_ids)
            .await
    }
}
