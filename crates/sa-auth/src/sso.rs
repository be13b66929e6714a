//! Single sign-on bridge
//!
//! The `sso_session` cookie carries `base64url(user id).base64url(tag)`,
//! where the tag is an HMAC-SHA256 of the user id under the token signing
//! secret. The login payload lives at `sso:<user id>` and is re-checked
//! against the blacklist and the token's own expiry every time it is
//! resolved.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sa_core::{AuthError, AuthResult};
use sa_kv::{get_json, set_json, KvStore};
use sa_models::LoginResponse;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::blacklist::TokenBlacklist;
use crate::cookie::{CookieConfig, SSO_COOKIE};
use crate::jwt::TokenService;

type HmacSha256 = Hmac<Sha256>;

fn session_key(user_id: &str) -> String {
    format!("sso:{}", user_id)
}

fn return_to_key(sid: &str) -> String {
    format!("return_to:{}", sid)
}

/// Why a cookie did not resolve to a session. Callers treat every variant
/// as "not signed in".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SsoRejection {
    #[error("no sso cookie")]
    Missing,
    #[error("sso cookie could not be decoded")]
    Undecodable,
    #[error("no session stored for cookie")]
    NotFound,
    #[error("stored session is corrupt")]
    Corrupt,
    #[error("session token has been revoked")]
    Blacklisted,
    #[error("session token is no longer valid")]
    InvalidToken,
    #[error("session store unavailable: {0}")]
    Store(String),
}

#[derive(Clone)]
pub struct SsoBridge {
    store: Arc<dyn KvStore>,
    tokens: Arc<TokenService>,
    blacklist: TokenBlacklist,
    signing_key: Arc<[u8]>,
    ttl: Duration,
    return_to_ttl: Duration,
    cookie: CookieConfig,
}

impl SsoBridge {
    pub fn new(
        store: Arc<dyn KvStore>,
        tokens: Arc<TokenService>,
        blacklist: TokenBlacklist,
        signing_key: &[u8],
        ttl: Duration,
        cookie: CookieConfig,
    ) -> Self {
        let cookie = cookie.with_max_age(ttl.as_secs());
        Self {
            store,
            tokens,
            blacklist,
            signing_key: Arc::from(signing_key),
            ttl,
            return_to_ttl: crate::csrf::DEFAULT_CSRF_TTL,
            cookie,
        }
    }

    pub fn from_config(
        store: Arc<dyn KvStore>,
        tokens: Arc<TokenService>,
        blacklist: TokenBlacklist,
        config: &sa_core::config::AppConfig,
    ) -> Self {
        let cookie = CookieConfig::new(SSO_COOKIE)
            .with_domain(config.auth.cookie_domain.clone())
            .with_secure(config.auth.cookie_secure)
            .with_same_site(config.auth.sso_same_site);
        let mut bridge = Self::new(
            store,
            tokens,
            blacklist,
            config.auth.jwt_secret.as_bytes(),
            Duration::from_secs(config.sso_ttl_seconds()),
            cookie,
        );
        bridge.return_to_ttl = Duration::from_secs(config.auth.csrf_ttl_seconds);
        bridge
    }

    /// Store the payload and return the Set-Cookie value
    pub async fn establish(&self, session: &LoginResponse) -> AuthResult<String> {
        let user_id = &session.user.id;
        set_json(
            self.store.as_ref(),
            &session_key(user_id),
            session,
            Some(self.ttl),
        )
        .await
        .map_err(AuthError::internal)?;

        tracing::debug!(user_id = %user_id, "SSO session established");
        Ok(self.cookie.build_cookie(&self.encode_cookie(user_id)?))
    }

    pub async fn resolve(&self, cookie_value: Option<&str>) -> Result<LoginResponse, SsoRejection> {
        let user_id = self.decode_cookie(cookie_value)?;

        let session: LoginResponse = match get_json(self.store.as_ref(), &session_key(&user_id)).await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(SsoRejection::NotFound),
            Err(sa_kv::KvError::Serialization(_)) => return Err(SsoRejection::Corrupt),
            Err(e) => return Err(SsoRejection::Store(e.to_string())),
        };
        if session.user.id != user_id {
            return Err(SsoRejection::Corrupt);
        }

        match self.blacklist.contains(&session.token).await {
            Ok(false) => {}
            Ok(true) => return Err(SsoRejection::Blacklisted),
            Err(e) => return Err(SsoRejection::Store(e.to_string())),
        }
        if self.tokens.validate(&session.token).is_err() {
            return Err(SsoRejection::InvalidToken);
        }

        Ok(session)
    }

    /// Drop the stored session if the cookie names one, and return an
    /// expiring cookie either way
    pub async fn clear(&self, cookie_value: Option<&str>) -> String {
        if let Ok(user_id) = self.decode_cookie(cookie_value) {
            if let Err(e) = self.store.delete(&session_key(&user_id)).await {
                tracing::warn!(error = %e, user_id = %user_id, "Failed to delete SSO session");
            }
        }
        self.cookie.build_clear_cookie()
    }

    pub async fn stage_return_to(&self, sid: &str, uri: &str) -> AuthResult<()> {
        self.store
            .set(&return_to_key(sid), uri, Some(self.return_to_ttl))
            .await
            .map_err(AuthError::internal)
    }

    fn cookie_mac(&self, user_id: &str) -> Result<HmacSha256, hmac::digest::InvalidLength> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)?;
        mac.update(b"sso:");
        mac.update(user_id.as_bytes());
        Ok(mac)
    }

    fn encode_cookie(&self, user_id: &str) -> AuthResult<String> {
        let tag = self
            .cookie_mac(user_id)
            .map_err(AuthError::internal)?
            .finalize()
            .into_bytes();
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(user_id),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// User id named by a cookie whose tag verifies
    fn decode_cookie(&self, cookie_value: Option<&str>) -> Result<String, SsoRejection> {
        let raw = cookie_value
            .filter(|v| !v.is_empty())
            .ok_or(SsoRejection::Missing)?;
        let (id_part, tag_part) = raw.split_once('.').ok_or(SsoRejection::Undecodable)?;
        let id_bytes = URL_SAFE_NO_PAD
            .decode(id_part)
            .map_err(|_| SsoRejection::Undecodable)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_part)
            .map_err(|_| SsoRejection::Undecodable)?;
        let user_id = String::from_utf8(id_bytes).map_err(|_| SsoRejection::Undecodable)?;
        if user_id.is_empty() {
            return Err(SsoRejection::Undecodable);
        }

        self.cookie_mac(&user_id)
            .map_err(|_| SsoRejection::Undecodable)?
            .verify_slice(&tag)
            .map_err(|_| SsoRejection::Undecodable)?;
        Ok(user_id)
    }

    /// Pop the staged deep link, if any
    pub async fn take_return_to(&self, sid: &str) -> Option<String> {
        match self.store.take(&return_to_key(sid)).await {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read staged return_to");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::extract_cookie;
    use base64::Engine as _;
    use sa_kv::MemoryStore;
    use sa_models::{Role, User};

    struct Fixture {
        store: Arc<MemoryStore>,
        tokens: Arc<TokenService>,
        blacklist: TokenBlacklist,
        bridge: SsoBridge,
    }

    const SIGNING_KEY: &[u8] = b"sso-test-secret-32-bytes-long!!!";

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenService::new(b"sso-test-secret-32-bytes-long!!!", 3600));
        let blacklist = TokenBlacklist::new(store.clone());
        let bridge = SsoBridge::new(
            store.clone(),
            tokens.clone(),
            blacklist.clone(),
            SIGNING_KEY,
            Duration::from_secs(3600),
            CookieConfig::new(SSO_COOKIE),
        );
        Fixture {
            store,
            tokens,
            blacklist,
            bridge,
        }
    }

    fn login(tokens: &TokenService) -> LoginResponse {
        let user = User::new("Alice", "alice@x", "hash")
            .with_roles(vec![Role::new("admin").with_permissions(["edit-major"])]);
        let token = tokens
            .issue(user.id, user.role_names(), user.permission_names())
            .unwrap();
        LoginResponse::new(token, &user)
    }

    fn cookie_value(set_cookie: &str) -> String {
        let pair = set_cookie.split(';').next().unwrap();
        extract_cookie(pair, SSO_COOKIE).unwrap()
    }

    #[tokio::test]
    async fn test_establish_and_resolve() {
        let f = fixture();
        let session = login(&f.tokens);

        let set_cookie = f.bridge.establish(&session).await.unwrap();
        assert!(set_cookie.contains("Max-Age=3600"));
        let value = cookie_value(&set_cookie);
        let (id_part, _) = value.split_once('.').unwrap();
        assert_eq!(URL_SAFE_NO_PAD.decode(id_part).unwrap(), session.user.id.as_bytes());

        let resolved = f.bridge.resolve(Some(&value)).await.unwrap();
        assert_eq!(resolved, session);
        assert!(f.store.ttl(&format!("sso:{}", session.user.id)).is_some());
    }

    #[tokio::test]
    async fn test_resolve_rejections() {
        let f = fixture();
        assert_eq!(f.bridge.resolve(None).await, Err(SsoRejection::Missing));
        assert_eq!(
            f.bridge.resolve(Some("!!!")).await,
            Err(SsoRejection::Undecodable)
        );

        let unknown = f.bridge.encode_cookie("nobody").unwrap();
        assert_eq!(
            f.bridge.resolve(Some(&unknown)).await,
            Err(SsoRejection::NotFound)
        );

        f.store.set("sso:broken", "{", None).await.unwrap();
        let broken = f.bridge.encode_cookie("broken").unwrap();
        assert_eq!(
            f.bridge.resolve(Some(&broken)).await,
            Err(SsoRejection::Corrupt)
        );
    }

    #[tokio::test]
    async fn test_forged_cookie_is_rejected() {
        let f = fixture();
        let session = login(&f.tokens);
        let genuine = cookie_value(&f.bridge.establish(&session).await.unwrap());
        let id_part = URL_SAFE_NO_PAD.encode(&session.user.id);

        let other_key = SsoBridge::new(
            f.store.clone(),
            f.tokens.clone(),
            f.blacklist.clone(),
            b"some-other-secret",
            Duration::from_secs(3600),
            CookieConfig::new(SSO_COOKIE),
        );
        let resigned = other_key.encode_cookie(&session.user.id).unwrap();
        let (_, genuine_tag) = genuine.split_once('.').unwrap();
        let swapped = format!("{}.{}", URL_SAFE_NO_PAD.encode("someone-else"), genuine_tag);

        for forged in [id_part.clone(), format!("{}.", id_part), resigned, swapped] {
            assert_eq!(
                f.bridge.resolve(Some(&forged)).await,
                Err(SsoRejection::Undecodable),
                "{}",
                forged
            );
            f.bridge.clear(Some(&forged)).await;
        }

        // clearing with a forged cookie leaves the real session alone
        assert_eq!(f.bridge.resolve(Some(&genuine)).await, Ok(session));
    }

    #[tokio::test]
    async fn test_revoked_token_invalidates_session() {
        let f = fixture();
        let session = login(&f.tokens);
        let value = cookie_value(&f.bridge.establish(&session).await.unwrap());

        f.blacklist
            .add(&session.token, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            f.bridge.resolve(Some(&value)).await,
            Err(SsoRejection::Blacklisted)
        );
    }

    #[tokio::test]
    async fn test_expired_token_invalidates_session() {
        let f = fixture();
        let expired = TokenService::new(b"sso-test-secret-32-bytes-long!!!", -10);
        let session = login(&expired);
        let value = cookie_value(&f.bridge.establish(&session).await.unwrap());

        assert_eq!(
            f.bridge.resolve(Some(&value)).await,
            Err(SsoRejection::InvalidToken)
        );
    }

    #[tokio::test]
    async fn test_clear() {
        let f = fixture();
        let session = login(&f.tokens);
        let value = cookie_value(&f.bridge.establish(&session).await.unwrap());

        let cleared = f.bridge.clear(Some(&value)).await;
        assert!(cleared.contains("Max-Age=0"));
        assert_eq!(
            f.bridge.resolve(Some(&value)).await,
            Err(SsoRejection::NotFound)
        );

        let cleared = f.bridge.clear(None).await;
        assert!(cleared.starts_with("sso_session=;"));
    }

    #[tokio::test]
    async fn test_return_to_is_taken_once() {
        let f = fixture();
        f.bridge
            .stage_return_to("sid", "/api/v1/oauth/authorize?client_id=app1")
            .await
            .unwrap();

        assert_eq!(
            f.bridge.take_return_to("sid").await.as_deref(),
            Some("/api/v1/oauth/authorize?client_id=app1")
        );
        assert_eq!(f.bridge.take_return_to("sid").await, None);
        assert_eq!(f.bridge.take_return_to("other").await, None);
    }
}
