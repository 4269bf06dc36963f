//! Shared primitives for all Rust crates in Shopdesk.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use auth::{AuthMode, CredentialPair, LoginCredentials};

/// Result type used across Shopdesk crates.
pub type AppResult<T> = Result<T, AppError>;

/// Message used when nothing more specific can be extracted from an error.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong.";

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Failed HTTP response as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// HTTP status code.
    pub status: u16,
    /// Top-level `message` from the response body, if any.
    pub message: Option<String>,
    /// Per-field validation messages in server order.
    pub field_errors: Vec<(String, Vec<String>)>,
}

impl ApiFailure {
    /// Builds a failure from a status code and a (possibly null) JSON body.
    #[must_use]
    pub fn from_response_body(status: u16, body: &Value) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(ToOwned::to_owned);

        let field_errors = body
            .get("errors")
            .and_then(Value::as_object)
            .map(|errors| {
                errors
                    .iter()
                    .map(|(field, messages)| {
                        let messages = match messages {
                            Value::Array(items) => items
                                .iter()
                                .filter_map(Value::as_str)
                                .map(ToOwned::to_owned)
                                .collect(),
                            Value::String(single) => vec![single.clone()],
                            _ => Vec::new(),
                        };
                        (field.clone(), messages)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            status,
            message,
            field_errors,
        }
    }

    /// Returns the first field-level validation message, if any.
    #[must_use]
    pub fn first_field_error(&self) -> Option<&str> {
        self.field_errors
            .first()
            .and_then(|(_, messages)| messages.first())
            .map(String::as_str)
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(formatter, "status {}: {message}", self.status),
            None => write!(formatter, "request failed with status code {}", self.status),
        }
    }
}

/// Common application error categories.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Session is missing, expired, or could not be refreshed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but blocked by a client-side permission check.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No response was received from the remote API.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote API answered with a non-success status.
    #[error("api error: {0}")]
    Api(ApiFailure),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status when the error came from an API response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(failure) => Some(failure.status),
            _ => None,
        }
    }

    /// Returns whether the API rejected the request with 401.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Extracts a human-readable message from a failed call.
///
/// Order: first per-field validation message, top-level API message,
/// transport or local error message, then `fallback`.
#[must_use]
pub fn extract_error_message(error: &AppError, fallback: &str) -> String {
    let message = match error {
        AppError::Api(failure) => failure
            .first_field_error()
            .or(failure.message.as_deref())
            .map(ToOwned::to_owned),
        AppError::Validation(message)
        | AppError::NotFound(message)
        | AppError::Conflict(message)
        | AppError::Unauthorized(message)
        | AppError::Forbidden(message)
        | AppError::Transport(message)
        | AppError::Internal(message) => Some(message.clone()),
    };

    message
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ApiFailure, AppError, NonEmptyString, extract_error_message};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn api_failure_keeps_field_order_from_body() {
        let failure = ApiFailure::from_response_body(
            422,
            &json!({
                "message": "The given data was invalid.",
                "errors": {
                    "name": ["The name field is required."],
                    "email": ["The email has already been taken."]
                }
            }),
        );

        assert_eq!(failure.field_errors.len(), 2);
        assert_eq!(failure.field_errors[0].0, "name");
        assert_eq!(
            failure.first_field_error(),
            Some("The name field is required.")
        );
    }

    #[test]
    fn field_error_wins_over_api_message() {
        let error = AppError::Api(ApiFailure::from_response_body(
            422,
            &json!({"message": "invalid", "errors": {"sku": ["SKU taken"]}}),
        ));

        assert_eq!(extract_error_message(&error, "fallback"), "SKU taken");
    }

    #[test]
    fn api_message_used_without_field_errors() {
        let error = AppError::Api(ApiFailure::from_response_body(
            403,
            &json!({"message": "This action is unauthorized."}),
        ));

        assert_eq!(
            extract_error_message(&error, "fallback"),
            "This action is unauthorized."
        );
    }

    #[test]
    fn transport_message_used_when_no_response() {
        let error = AppError::Transport("connection refused".to_owned());
        assert_eq!(
            extract_error_message(&error, "fallback"),
            "connection refused"
        );
    }

    #[test]
    fn fallback_used_for_bare_status() {
        let error = AppError::Api(ApiFailure::from_response_body(500, &serde_json::Value::Null));
        assert_eq!(extract_error_message(&error, "Unable to login."), "Unable to login.");
        assert!(!error.is_unauthenticated());
    }
}
