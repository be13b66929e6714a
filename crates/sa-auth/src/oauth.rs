//! Authorization-code provider for internal relying applications
//!
//! A code is a 256-bit random string stored under `oauth_code:<code>` for
//! ten minutes. The client is authenticated before the store is touched;
//! after that the code is popped with GETDEL before its record is compared,
//! so an authenticated client gets one attempt per code.

use chrono::Utc;
use sa_core::AuthError;
use sa_db::OAuthClientStore;
use sa_kv::{set_json, KvStore};
use sa_models::{AuthorizationCodeRecord, LoginResponse, OAuthClient};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cookie::random_token;
use crate::password::{CredentialVerifier, PasswordError};

pub const CODE_TTL: Duration = Duration::from_secs(10 * 60);

fn code_key(code: &str) -> String {
    format!("oauth_code:{}", code)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OAuthError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unsupported response type")]
    UnsupportedResponseType,
    #[error("invalid client")]
    InvalidClient,
    #[error("invalid grant: {0}")]
    InvalidGrant(&'static str),
    #[error("store failure: {0}")]
    Store(String),
}

impl OAuthError {
    /// RFC 6749 error code
    pub fn error_code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::UnsupportedResponseType => "unsupported_response_type",
            OAuthError::InvalidClient => "invalid_client",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::Store(_) => "server_error",
        }
    }
}

impl From<OAuthError> for AuthError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::InvalidRequest(msg) => AuthError::InvalidRequest(msg),
            OAuthError::UnsupportedResponseType => {
                AuthError::invalid_request("response_type must be code")
            }
            OAuthError::InvalidClient => AuthError::InvalidClient,
            OAuthError::InvalidGrant(_) => AuthError::InvalidGrant,
            OAuthError::Store(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<sa_db::RepositoryError> for OAuthError {
    fn from(err: sa_db::RepositoryError) -> Self {
        OAuthError::Store(err.to_string())
    }
}

impl From<sa_kv::KvError> for OAuthError {
    fn from(err: sa_kv::KvError) -> Self {
        OAuthError::Store(err.to_string())
    }
}

pub type OAuthResult<T> = Result<T, OAuthError>;

/// Build a client record from a plain secret
pub fn hashed_client(
    verifier: &CredentialVerifier,
    id: impl Into<String>,
    name: impl Into<String>,
    secret: &str,
    redirect_uri: impl Into<String>,
) -> Result<OAuthClient, PasswordError> {
    Ok(OAuthClient::new(id, name, verifier.hash(secret)?, redirect_uri))
}

#[derive(Clone)]
pub struct OAuthProvider {
    clients: Arc<dyn OAuthClientStore>,
    store: Arc<dyn KvStore>,
    verifier: CredentialVerifier,
    code_ttl: Duration,
}

impl OAuthProvider {
    pub fn new(
        clients: Arc<dyn OAuthClientStore>,
        store: Arc<dyn KvStore>,
        verifier: CredentialVerifier,
    ) -> Self {
        Self {
            clients,
            store,
            verifier,
            code_ttl: CODE_TTL,
        }
    }

    /// Validate an authorization request before a session is looked at
    pub async fn check_authorize_request(
        &self,
        client_id: &str,
        redirect_uri: &str,
        response_type: &str,
    ) -> OAuthResult<OAuthClient> {
        if client_id.is_empty() || redirect_uri.is_empty() {
            return Err(OAuthError::InvalidRequest(
                "client_id and redirect_uri are required".to_string(),
            ));
        }
        if response_type != "code" {
            return Err(OAuthError::UnsupportedResponseType);
        }

        let client = self
            .clients
            .find_by_id(client_id)
            .await?
            .ok_or(OAuthError::InvalidClient)?;

        if !client.redirect_matches(redirect_uri) {
            tracing::warn!(client_id = %client_id, "Authorization request with unregistered redirect_uri");
            return Err(OAuthError::InvalidRequest(
                "redirect_uri does not match the registered value".to_string(),
            ));
        }
        Ok(client)
    }

    /// Mint a code bound to the client, redirect URI and session
    pub async fn issue_code(
        &self,
        client: &OAuthClient,
        redirect_uri: &str,
        session: &LoginResponse,
    ) -> OAuthResult<String> {
        let code = random_token();
        let ttl = chrono::Duration::from_std(self.code_ttl)
            .map_err(|e| OAuthError::Store(e.to_string()))?;
        let record = AuthorizationCodeRecord {
            code: code.clone(),
            client_id: client.id.clone(),
            session: session.clone(),
            redirect_uri: redirect_uri.to_string(),
            expires_at: Utc::now() + ttl,
        };
        set_json(self.store.as_ref(), &code_key(&code), &record, Some(self.code_ttl)).await?;

        tracing::info!(client_id = %client.id, user_id = %session.user.id, "Authorization code issued");
        Ok(code)
    }

    pub async fn authorize(
        &self,
        client_id: &str,
        redirect_uri: &str,
        response_type: &str,
        session: &LoginResponse,
    ) -> OAuthResult<String> {
        let client = self
            .check_authorize_request(client_id, redirect_uri, response_type)
            .await?;
        self.issue_code(&client, redirect_uri, session).await
    }

    /// Redeem a code for the session it was issued with
    pub async fn exchange(
        &self,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        code: &str,
    ) -> OAuthResult<LoginResponse> {
        if [client_id, client_secret, redirect_uri, code]
            .iter()
            .any(|p| p.is_empty())
        {
            return Err(OAuthError::InvalidRequest(
                "client_id, client_secret, redirect_uri and code are required".to_string(),
            ));
        }

        let client = self
            .clients
            .find_by_id(client_id)
            .await?
            .ok_or(OAuthError::InvalidClient)?;
        if !self.verifier.verify(client_secret, &client.secret_hash) {
            tracing::warn!(client_id = %client_id, "Token request with wrong client secret");
            return Err(OAuthError::InvalidClient);
        }
        if !client.redirect_matches(redirect_uri) {
            return Err(OAuthError::InvalidGrant("redirect_uri mismatch"));
        }

        let raw = self
            .store
            .take(&code_key(code))
            .await?
            .ok_or(OAuthError::InvalidGrant("unknown or used code"))?;
        let record: AuthorizationCodeRecord =
            serde_json::from_str(&raw).map_err(|_| OAuthError::InvalidGrant("unknown or used code"))?;

        if record.client_id != client.id {
            return Err(OAuthError::InvalidGrant("code was issued to another client"));
        }
        if record.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant("redirect_uri mismatch"));
        }
        if record.is_expired_at(Utc::now()) {
            return Err(OAuthError::InvalidGrant("code expired"));
        }

        tracing::info!(client_id = %client.id, user_id = %record.session.user.id, "Authorization code redeemed");
        Ok(record.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_db::MemoryOAuthClients;
    use sa_kv::MemoryStore;
    use sa_models::User;

    const REDIRECT: &str = "https://app1.example.edu/callback";

    struct Fixture {
        store: Arc<MemoryStore>,
        provider: OAuthProvider,
        session: LoginResponse,
    }

    fn fixture() -> Fixture {
        let verifier = CredentialVerifier::with_params(8, 1, 1).unwrap();
        let clients = Arc::new(MemoryOAuthClients::new());
        clients.insert(hashed_client(&verifier, "app1", "LMS", "s3cret", REDIRECT).unwrap());
        clients.insert(
            hashed_client(&verifier, "app2", "Library", "other", "https://app2/cb").unwrap(),
        );

        let store = Arc::new(MemoryStore::new());
        let provider = OAuthProvider::new(clients, store.clone(), verifier);
        let session = LoginResponse::new("jwt-token", &User::new("Alice", "alice@x", "h"));
        Fixture {
            store,
            provider,
            session,
        }
    }

    #[tokio::test]
    async fn test_code_flow() {
        let f = fixture();
        let code = f
            .provider
            .authorize("app1", REDIRECT, "code", &f.session)
            .await
            .unwrap();
        assert_eq!(code.len(), 43);
        let ttl = f.store.ttl(&code_key(&code)).unwrap();
        assert!(ttl <= CODE_TTL && ttl > CODE_TTL - Duration::from_secs(5));

        let session = f
            .provider
            .exchange("app1", "s3cret", REDIRECT, &code)
            .await
            .unwrap();
        assert_eq!(session, f.session);

        let again = f.provider.exchange("app1", "s3cret", REDIRECT, &code).await;
        assert!(matches!(again, Err(OAuthError::InvalidGrant(_))));
    }

    #[tokio::test]
    async fn test_authorize_rejections() {
        let f = fixture();
        let p = &f.provider;

        assert_eq!(
            p.authorize("app1", REDIRECT, "token", &f.session).await,
            Err(OAuthError::UnsupportedResponseType)
        );
        assert_eq!(
            p.authorize("nope", REDIRECT, "code", &f.session).await,
            Err(OAuthError::InvalidClient)
        );
        assert!(matches!(
            p.authorize("", REDIRECT, "code", &f.session).await,
            Err(OAuthError::InvalidRequest(_))
        ));
        for near_miss in [
            "https://app1.example.edu/callback/",
            "https://app1.example.edu/callback?x=1",
            "https://app1.example.edu/other",
        ] {
            assert!(matches!(
                p.authorize("app1", near_miss, "code", &f.session).await,
                Err(OAuthError::InvalidRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_exchange_rejections() {
        let f = fixture();
        let p = &f.provider;

        let code = p.authorize("app1", REDIRECT, "code", &f.session).await.unwrap();
        assert_eq!(
            p.exchange("app1", "wrong", REDIRECT, &code).await,
            Err(OAuthError::InvalidClient)
        );
        // an unauthenticated attempt leaves the code for its client
        assert_eq!(
            p.exchange("app1", "s3cret", REDIRECT, &code).await,
            Ok(f.session.clone())
        );

        let code = p.authorize("app1", REDIRECT, "code", &f.session).await.unwrap();
        assert_eq!(
            p.exchange("app1", "s3cret", "https://app1.example.edu/callback/", &code)
                .await,
            Err(OAuthError::InvalidGrant("redirect_uri mismatch"))
        );

        let code = p.authorize("app1", REDIRECT, "code", &f.session).await.unwrap();
        assert_eq!(
            p.exchange("app2", "other", "https://app2/cb", &code).await,
            Err(OAuthError::InvalidGrant("code was issued to another client"))
        );

        assert!(matches!(
            p.exchange("app1", "", REDIRECT, "x").await,
            Err(OAuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            p.exchange("ghost", "s3cret", REDIRECT, "x").await,
            Err(OAuthError::InvalidClient)
        ));
    }

    #[tokio::test]
    async fn test_expired_code() {
        let f = fixture();
        let record = AuthorizationCodeRecord {
            code: "stale".into(),
            client_id: "app1".into(),
            session: f.session.clone(),
            redirect_uri: REDIRECT.into(),
            expires_at: Utc::now() - chrono::Duration::seconds(1),
        };
        set_json(f.store.as_ref(), &code_key("stale"), &record, None).await.unwrap();

        assert_eq!(
            f.provider.exchange("app1", "s3cret", REDIRECT, "stale").await,
            Err(OAuthError::InvalidGrant("code expired"))
        );
    }

    #[tokio::test]
    async fn test_exchange_only_reaches_code_keys() {
        let f = fixture();
        let p = &f.provider;
        let blacklist = crate::blacklist::TokenBlacklist::new(f.store.clone());
        blacklist
            .add("revoked.jwt.value", Duration::from_secs(3600))
            .await
            .unwrap();
        f.store.set("sso:some-user", "{}", None).await.unwrap();

        // unknown client, then a real client, both aiming at foreign keys
        for (client, secret) in [("nobody", "x"), ("app1", "s3cret")] {
            for key in ["revoked.jwt.value", "sso:some-user"] {
                assert!(p.exchange(client, secret, REDIRECT, key).await.is_err());
            }
        }

        assert!(blacklist.contains("revoked.jwt.value").await.unwrap());
        assert!(f.store.contains("sso:some-user"));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(AuthError::from(OAuthError::InvalidClient).status_code(), 401);
        assert_eq!(
            AuthError::from(OAuthError::InvalidGrant("x")).error_code(),
            "invalid_grant"
        );
        assert_eq!(OAuthError::UnsupportedResponseType.error_code(), "unsupported_response_type");
    }
}
