//! CSRF protection for the server-rendered login form
//!
//! Each browser carries a random `csrf_sid` cookie. Tokens issued to that
//! browser are members of the set `csrf:sess:<sid>`; validating a token
//! removes it, so every token works once.

use sa_core::{AuthError, AuthResult};
use sa_kv::KvStore;
use std::sync::Arc;
use std::time::Duration;

use crate::cookie::{random_token, CookieConfig, CSRF_COOKIE};

pub const DEFAULT_CSRF_TTL: Duration = Duration::from_secs(30 * 60);

fn session_key(sid: &str) -> String {
    format!("csrf:sess:{}", sid)
}

/// CSRF session for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfSession {
    pub sid: String,
    /// Present when the sid was minted for this request
    pub set_cookie: Option<String>,
}

#[derive(Clone)]
pub struct CsrfManager {
    store: Arc<dyn KvStore>,
    ttl: Duration,
    cookie: CookieConfig,
}

impl CsrfManager {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration, secure: bool) -> Self {
        let cookie = CookieConfig::new(CSRF_COOKIE)
            .with_secure(secure)
            .with_max_age(ttl.as_secs());
        Self { store, ttl, cookie }
    }

    pub fn from_config(store: Arc<dyn KvStore>, config: &sa_core::config::AppConfig) -> Self {
        Self::new(
            store,
            Duration::from_secs(config.auth.csrf_ttl_seconds),
            config.auth.cookie_secure,
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reuse the browser's sid or mint a new one
    pub fn ensure_session(&self, cookie_sid: Option<&str>) -> CsrfSession {
        match cookie_sid.filter(|sid| !sid.is_empty()) {
            Some(sid) => CsrfSession {
                sid: sid.to_string(),
                set_cookie: None,
            },
            None => {
                let sid = random_token();
                let set_cookie = Some(self.cookie.build_cookie(&sid));
                CsrfSession { sid, set_cookie }
            }
        }
    }

    pub async fn issue_token(&self, sid: &str) -> AuthResult<String> {
        let key = session_key(sid);
        let token = random_token();
        self.store
            .set_add(&key, &token)
            .await
            .map_err(AuthError::internal)?;
        self.store
            .expire(&key, self.ttl)
            .await
            .map_err(AuthError::internal)?;
        Ok(token)
    }

    /// Consume a token; anything missing or failing is `false`
    pub async fn validate(&self, sid: Option<&str>, submitted: Option<&str>) -> bool {
        let (Some(sid), Some(token)) = (sid, submitted) else {
            return false;
        };
        if sid.is_empty() || token.is_empty() {
            return false;
        }

        let key = session_key(sid);
        match self.store.set_remove(&key, token).await {
            Ok(true) => {
                if let Err(e) = self.store.expire(&key, self.ttl).await {
                    tracing::debug!(error = %e, "Failed to refresh CSRF session TTL");
                }
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::warn!(error = %e, "CSRF validation failed on store error");
                false
            }
        }
    }
}
