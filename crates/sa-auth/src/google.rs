//! Google sign-in
//!
//! Authorization-code flow against Google with the `oauth2` client, followed
//! by a `userinfo` lookup. Only profiles whose email Google has verified are
//! handed to the auth service.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use sa_core::config::GoogleConfig;
use serde::Deserialize;
use thiserror::Error;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("identity provider is misconfigured: {0}")]
    Config(String),
    #[error("code exchange failed: {0}")]
    Exchange(String),
    #[error("profile lookup failed: {0}")]
    Profile(String),
    #[error("email address is not verified by the identity provider")]
    UnverifiedEmail,
}

/// Profile of a user whose email the provider has verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Raw `userinfo` response
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl GoogleUserInfo {
    pub fn into_verified_profile(self) -> Result<FederatedProfile, FederationError> {
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| FederationError::Profile("no email in profile".to_string()))?;
        if self.email_verified != Some(true) {
            return Err(FederationError::UnverifiedEmail);
        }
        Ok(FederatedProfile {
            subject: self.sub,
            email,
            name: self.name,
            picture: self.picture,
        })
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent page URL carrying `state`
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange the callback code for a verified profile
    async fn fetch_profile(&self, code: &str) -> Result<FederatedProfile, FederationError>;
}

pub struct GoogleIdentityProvider {
    client: BasicClient,
    http: reqwest::Client,
}

impl GoogleIdentityProvider {
    pub fn new(config: &GoogleConfig, redirect_url: &str) -> Result<Self, FederationError> {
        let config_err = |e: oauth2::url::ParseError| FederationError::Config(e.to_string());
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(AUTHORIZE_URL.to_string()).map_err(config_err)?,
            Some(TokenUrl::new(TOKEN_URL.to_string()).map_err(config_err)?),
        )
        .set_redirect_uri(RedirectUrl::new(redirect_url.to_string()).map_err(config_err)?);

        Ok(Self {
            client,
            http: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorize_url(&self, state: &str) -> String {
        let state = state.to_string();
        let (url, _) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();
        url.to_string()
    }

    async fn fetch_profile(&self, code: &str) -> Result<FederatedProfile, FederationError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| FederationError::Exchange(e.to_string()))?;

        let info: GoogleUserInfo = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FederationError::Profile(e.to_string()))?
            .json()
            .await
            .map_err(|e| FederationError::Profile(e.to_string()))?;

        info.into_verified_profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(email_verified: Option<bool>) -> GoogleUserInfo {
        GoogleUserInfo {
            sub: "1234".into(),
            email: Some("alice@x".into()),
            email_verified,
            name: Some("Alice".into()),
            picture: None,
        }
    }

    #[test]
    fn test_verified_profile() {
        let profile = info(Some(true)).into_verified_profile().unwrap();
        assert_eq!(profile.email, "alice@x");
        assert_eq!(profile.subject, "1234");
    }

    #[test]
    fn test_unverified_email_is_rejected() {
        assert!(matches!(
            info(Some(false)).into_verified_profile(),
            Err(FederationError::UnverifiedEmail)
        ));
        assert!(matches!(
            info(None).into_verified_profile(),
            Err(FederationError::UnverifiedEmail)
        ));
    }

    #[test]
    fn test_userinfo_deserializes() {
        let raw = r#"{"sub":"42","email":"bob@x","email_verified":true,"name":"Bob"}"#;
        let info: GoogleUserInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.into_verified_profile().unwrap().email, "bob@x");
    }

    #[test]
    fn test_authorize_url_carries_state() {
        let provider = GoogleIdentityProvider::new(
            &GoogleConfig {
                client_id: "client-1".into(),
                client_secret: "secret".into(),
            },
            "https://api.example.edu/api/v1/auth/google/callback",
        )
        .unwrap();

        let url = provider.authorize_url("state-xyz");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("state=state-xyz"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("response_type=code"));
    }
}
