use std::fmt::{Debug, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, NonEmptyString};

/// How the console authenticates against the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Bearer access tokens with refresh-token rotation.
    #[default]
    Jwt,
    /// Cookie session with a CSRF bootstrap call before login.
    Sanctum,
}

impl AuthMode {
    /// Returns a stable configuration value for this mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jwt => "jwt",
            Self::Sanctum => "sanctum",
        }
    }

    /// Returns whether requests carry bearer tokens that can be refreshed.
    #[must_use]
    pub fn uses_bearer_tokens(&self) -> bool {
        matches!(self, Self::Jwt)
    }
}

impl FromStr for AuthMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jwt" => Ok(Self::Jwt),
            "sanctum" => Ok(Self::Sanctum),
            other => Err(AppError::Validation(format!(
                "auth mode must be either 'jwt' or 'sanctum', got '{other}'"
            ))),
        }
    }
}

/// Access token plus the optional refresh token minted with it.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    access_token: NonEmptyString,
    refresh_token: Option<String>,
}

impl CredentialPair {
    /// Creates a credential pair. The access token must not be blank.
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> AppResult<Self> {
        Ok(Self {
            access_token: NonEmptyString::new(access_token)?,
            refresh_token: refresh_token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// Returns the bearer access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.as_str()
    }

    /// Returns the refresh token, if the server issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}

impl Debug for CredentialPair {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Email and password submitted to the login endpoint.
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    email: String,
    password: String,
}

impl LoginCredentials {
    /// Creates login credentials. The email is trimmed; the password is kept verbatim.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> AppResult<Self> {
        let email = email.into().trim().to_owned();
        if email.is_empty() {
            return Err(AppError::Validation("email must not be empty".to_owned()));
        }

        let password = password.into();
        if password.is_empty() {
            return Err(AppError::Validation(
                "password must not be empty".to_owned(),
            ));
        }

        Ok(Self { email, password })
    }

    /// Returns the login email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }
}

impl Debug for LoginCredentials {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AuthMode, CredentialPair, LoginCredentials};

    #[test]
    fn auth_mode_parses_case_insensitively() {
        assert_eq!(AuthMode::from_str("SANCTUM").ok(), Some(AuthMode::Sanctum));
        assert_eq!(AuthMode::from_str(" jwt ").ok(), Some(AuthMode::Jwt));
        assert!(AuthMode::from_str("oauth").is_err());
    }

    #[test]
    fn credential_pair_drops_blank_refresh_token() {
        let pair = CredentialPair::new("tok1", Some("  ".to_owned()));
        assert!(pair.is_ok());
        let pair = pair.unwrap_or_else(|_| unreachable!());
        assert_eq!(pair.access_token(), "tok1");
        assert!(pair.refresh_token().is_none());
        assert!(!format!("{pair:?}").contains("tok1"));
    }

    #[test]
    fn login_credentials_redact_password() {
        let credentials = LoginCredentials::new(" a@b.com ", "x");
        assert!(credentials.is_ok());
        let credentials = credentials.unwrap_or_else(|_| unreachable!());
        assert_eq!(credentials.email(), "a@b.com");
        assert!(!format!("{credentials:?}").contains("\"x\""));
    }
}
