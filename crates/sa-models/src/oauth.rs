//! OAuth client and authorization code models
//!
//! Table: m_oauth_client. Authorization codes only live in the key-value
//! store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::LoginResponse;

/// A relying application allowed to use the authorization-code flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClient {
    pub id: String,
    pub name: String,
    /// Hash of the client secret, never the secret itself
    #[serde(skip_serializing, default)]
    pub secret_hash: String,
    /// The single redirect URI registered for this client
    pub redirect_uri: String,
}

impl OAuthClient {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        secret_hash: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            secret_hash: secret_hash.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Byte-for-byte comparison, no normalization
    pub fn redirect_matches(&self, redirect_uri: &str) -> bool {
        self.redirect_uri == redirect_uri
    }
}

/// Stored under the code itself while the code is redeemable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeRecord {
    pub code: String,
    pub client_id: String,
    pub session: LoginResponse,
    pub redirect_uri: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationCodeRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_must_match_exactly() {
        let client = OAuthClient::new("app1", "LMS", "hash", "https://app1/cb");
        assert!(client.redirect_matches("https://app1/cb"));
        assert!(!client.redirect_matches("https://app1/cb/"));
        assert!(!client.redirect_matches("https://app1/cb?x=1"));
        assert!(!client.redirect_matches("HTTPS://app1/cb"));
    }
}
