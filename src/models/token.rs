use serde::{Deserialize, Serialize};
use std::fmt;

/// The credentials issued by the backend on login and on every refresh.
///
/// Both halves always travel together: a store either holds a complete pair or nothing.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        TokenPair {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// A pair with an empty half is treated as no pair at all.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/refresh`.
#[derive(Serialize, Debug)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Credentials for `POST /auth/login`.
#[derive(Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_tokens() {
        let pair = TokenPair::new("secret-access", "secret-refresh");
        let rendered = format!("{:?}", pair);
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }

    #[test]
    fn incomplete_pairs_are_detected() {
        assert!(TokenPair::new("a", "r").is_complete());
        assert!(!TokenPair::new("", "r").is_complete());
        assert!(!TokenPair::new("a", "").is_complete());
    }
}
