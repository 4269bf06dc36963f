//! Association endpoints whose request shape varies across backend versions.
//!
//! Each probe is an ordered list of endpoints crossed with an ordered list of
//! payload keys. Candidates are tried endpoint-major until one is accepted.

use serde_json::{Map, Value};
use shopdesk_core::{AppError, AppResult};
use tracing::debug;

use crate::{ApiMethod, ApiRequest, ApiTransport};

/// Statuses meaning "this backend speaks another shape; try the next candidate".
pub const RETRYABLE_PROBE_STATUSES: &[u16] = &[404, 405, 422];

/// Ordered candidates for one association operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationProbe {
    /// Operation name used in logs.
    pub name: &'static str,
    /// Endpoints as `(method, path template)`; `{id}` is substituted.
    pub endpoints: &'static [(ApiMethod, &'static str)],
    /// Body keys holding the id list, in preference order.
    pub payload_keys: &'static [&'static str],
}

/// Replaces the permission set of a role.
pub const ROLE_PERMISSION_SYNC: AssociationProbe = AssociationProbe {
    name: "role_permission_sync",
    endpoints: &[
        (ApiMethod::Put, "/roles/{id}/permissions"),
        (ApiMethod::Post, "/roles/{id}/permissions"),
        (ApiMethod::Put, "/roles/{id}/sync-permissions"),
        (ApiMethod::Post, "/roles/{id}/sync-permissions"),
    ],
    payload_keys: &["permission_ids", "permissions", "permissionIds"],
};

/// Replaces the role set of a user.
pub const USER_ROLE_ASSIGNMENT: AssociationProbe = AssociationProbe {
    name: "user_role_assignment",
    endpoints: &[
        (ApiMethod::Post, "/users/{id}/roles"),
        (ApiMethod::Put, "/users/{id}/roles"),
        (ApiMethod::Post, "/users/{id}/assign-roles"),
        (ApiMethod::Put, "/users/{id}/sync-roles"),
    ],
    payload_keys: &["role_ids", "roles", "roleIds"],
};

/// One concrete request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeCandidate {
    /// HTTP method.
    pub method: ApiMethod,
    /// Path template with `{id}`.
    pub path_template: &'static str,
    /// Body key holding the id list.
    pub payload_key: &'static str,
}

impl ProbeCandidate {
    fn request(&self, id: &str, ids: &[Value]) -> ApiRequest {
        let mut body = Map::new();
        body.insert(self.payload_key.to_owned(), Value::Array(ids.to_vec()));
        ApiRequest::new(self.method, self.path_template.replace("{id}", id))
            .with_body(Value::Object(body))
    }
}

impl AssociationProbe {
    /// Returns every candidate in trial order.
    pub fn candidates(&self) -> impl Iterator<Item = ProbeCandidate> + '_ {
        self.endpoints
            .iter()
            .flat_map(move |&(method, path_template)| {
                self.payload_keys
                    .iter()
                    .map(move |&payload_key| ProbeCandidate {
                        method,
                        path_template,
                        payload_key,
                    })
            })
    }

    /// Tries candidates in order until one is accepted.
    ///
    /// A 404, 405 or 422 moves on to the next candidate; any other failure is
    /// returned at once. When every candidate was rejected the last rejection
    /// is returned.
    pub async fn run(
        &self,
        transport: &dyn ApiTransport,
        id: &str,
        ids: &[Value],
    ) -> AppResult<Value> {
        let mut last_error = None;
        for candidate in self.candidates() {
            match transport.send(candidate.request(id, ids)).await {
                Ok(body) => {
                    debug!(
                        probe = self.name,
                        method = candidate.method.as_str(),
                        path = candidate.path_template,
                        payload_key = candidate.payload_key,
                        "association candidate accepted"
                    );
                    return Ok(body);
                }
                Err(error) if is_retryable(&error) => {
                    debug!(
                        probe = self.name,
                        method = candidate.method.as_str(),
                        path = candidate.path_template,
                        payload_key = candidate.payload_key,
                        status = error.status().unwrap_or_default(),
                        "association candidate rejected"
                    );
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::Internal(format!("association probe '{}' has no candidates", self.name))
        }))
    }
}

fn is_retryable(error: &AppError) -> bool {
    error
        .status()
        .is_some_and(|status| RETRYABLE_PROBE_STATUSES.contains(&status))
}
