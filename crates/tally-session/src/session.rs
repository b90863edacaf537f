//! Session data structure

/// Durable storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Durable storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Short-lived bearer credential; empty when logged out
    pub access_token: String,
    /// Longer-lived credential used only to mint new access tokens
    pub refresh_token: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.refresh_token.is_empty()
    }
}

// Tokens stay out of logs
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

fn redact(token: &str) -> &'static str {
    if token.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}
