use async_trait::async_trait;
use serde_json::Value;
use shopdesk_core::{AppResult, AuthMode};

/// Header carrying the per-request correlation identifier.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl ApiMethod {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// One logical API call relative to the resource base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: ApiMethod,
    /// Path appended to the base URL, starting with `/`.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// Optional JSON body.
    pub body: Option<Value>,
    /// Extra headers supplied by the caller.
    pub headers: Vec<(String, String)>,
    /// Set once the request has been replayed after a token refresh.
    pub retried: bool,
    /// Exempt from the refresh flow; a 401 is returned to the caller as-is.
    pub auth_exempt: bool,
}

impl ApiRequest {
    /// Creates a request without body.
    #[must_use]
    pub fn new(method: ApiMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            retried: false,
            auth_exempt: false,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Get, path)
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(ApiMethod::Post, path).with_body(body)
    }

    /// Creates a PUT request with a JSON body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(ApiMethod::Put, path).with_body(body)
    }

    /// Creates a PATCH request with a JSON body.
    #[must_use]
    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(ApiMethod::Patch, path).with_body(body)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Delete, path)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Appends query parameters.
    #[must_use]
    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Adds a header, replacing an existing one with the same name.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Marks the request as exempt from the refresh flow.
    #[must_use]
    pub fn exempt_from_auth(mut self) -> Self {
        self.auth_exempt = true;
        self
    }

    /// Returns a header value, matching the name case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Port for the authenticated HTTP pipeline.
///
/// Implementations attach credentials, handle 401 refresh and map failures
/// onto `AppError::Api` or `AppError::Transport`.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Returns the authentication mode the pipeline runs in.
    fn auth_mode(&self) -> AuthMode;

    /// Sends one request and returns the decoded JSON body, `Null` when empty.
    async fn send(&self, request: ApiRequest) -> AppResult<Value>;

    /// Obtains the CSRF cookie required before a cookie-mode login.
    async fn request_csrf_cookie(&self) -> AppResult<()>;
}

/// Callback invoked when the pipeline gives up on the current session.
pub trait UnauthorizedHandler: Send + Sync {
    /// Tears the session down after an unrecoverable 401.
    fn on_unauthorized(&self);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ApiMethod, ApiRequest, REQUEST_ID_HEADER};

    #[test]
    fn with_header_replaces_case_insensitively() {
        let request = ApiRequest::get("/users")
            .with_header("x-request-id", "first")
            .with_header(REQUEST_ID_HEADER, "second");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("X-REQUEST-ID"), Some("second"));
    }

    #[test]
    fn body_constructors_set_method_and_body() {
        let request = ApiRequest::patch("/admin/orders/4/status", json!({"status": "shipped"}));
        assert_eq!(request.method, ApiMethod::Patch);
        assert_eq!(request.body, Some(json!({"status": "shipped"})));
        assert!(!request.retried);
        assert!(!request.auth_exempt);
    }
}
