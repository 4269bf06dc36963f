//! Authenticated user payload and its derived display helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque user profile returned by the API.
///
/// The raw payload is kept intact so nested role and permission shapes
/// survive persistence; accessors read the common fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionUser(Value);

impl SessionUser {
    /// Wraps a raw user payload.
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Returns the raw payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.0
    }

    /// Returns the user identifier rendered as text.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Returns the user email.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.text_field("email")
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.text_field("name")
    }

    /// Returns up to two uppercase initials of the display name, `U` when unnamed.
    #[must_use]
    pub fn initials(&self) -> String {
        let initials: String = self
            .name()
            .unwrap_or_default()
            .split_whitespace()
            .take(2)
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect();

        if initials.is_empty() {
            "U".to_owned()
        } else {
            initials
        }
    }

    fn text_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}
