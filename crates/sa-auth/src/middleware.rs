//! Bearer authentication
//!
//! The blacklist is consulted before the token is decoded, so a revoked
//! token is refused even while its signature and expiry are still valid.

use sa_core::{AuthError, AuthResult};
use std::sync::Arc;

use crate::blacklist::TokenBlacklist;
use crate::cookie::extract_cookie;
use crate::jwt::{extract_bearer_token, TokenService};
use crate::permissions::CurrentUser;

/// The request headers authentication looks at
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    pub authorization: Option<String>,
    pub cookie: Option<String>,
}

impl RequestHeaders {
    /// Create from header name/value pairs; repeated Cookie headers are joined
    pub fn from_pairs(headers: &[(String, String)]) -> Self {
        let mut result = Self::default();
        for (name, value) in headers {
            match name.to_lowercase().as_str() {
                "authorization" => result.authorization = Some(value.clone()),
                "cookie" => {
                    result.cookie = Some(match result.cookie.take() {
                        Some(existing) => format!("{}; {}", existing, value),
                        None => value.clone(),
                    })
                }
                _ => {}
            }
        }
        result
    }

    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.cookie.as_deref().and_then(|c| extract_cookie(c, name))
    }
}

#[derive(Clone)]
pub struct BearerGuard {
    tokens: Arc<TokenService>,
    blacklist: TokenBlacklist,
}

impl BearerGuard {
    pub fn new(tokens: Arc<TokenService>, blacklist: TokenBlacklist) -> Self {
        Self { tokens, blacklist }
    }

    pub async fn authenticate(&self, headers: &RequestHeaders) -> AuthResult<CurrentUser> {
        let token = headers
            .authorization
            .as_deref()
            .and_then(extract_bearer_token)
            .ok_or(AuthError::TokenMissing)?;
        self.authenticate_token(token).await
    }

    pub async fn authenticate_token(&self, token: &str) -> AuthResult<CurrentUser> {
        if self.blacklist.contains(token).await? {
            return Err(AuthError::TokenBlacklisted);
        }
        let claims = self.tokens.validate(token)?;
        Ok(CurrentUser::from_claims(claims, token)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_kv::MemoryStore;
    use sa_models::Id;
    use std::time::Duration;

    fn guard() -> (Arc<TokenService>, TokenBlacklist, BearerGuard) {
        let tokens = Arc::new(TokenService::new(b"guard-test-secret-32-bytes-long!", 3600));
        let blacklist = TokenBlacklist::new(Arc::new(MemoryStore::new()));
        let guard = BearerGuard::new(tokens.clone(), blacklist.clone());
        (tokens, blacklist, guard)
    }

    fn bearer(token: &str) -> RequestHeaders {
        RequestHeaders::from_pairs(&[("Authorization".to_string(), format!("Bearer {}", token))])
    }

    #[tokio::test]
    async fn test_valid_token() {
        let (tokens, _, guard) = guard();
        let id = Id::new_v4();
        let token = tokens.issue(id, vec!["admin".into()], vec![]).unwrap();

        let user = guard.authenticate(&bearer(&token)).await.unwrap();
        assert_eq!(user.id, id);
        assert!(user.has_role("admin"));
        assert_eq!(user.token, token);
    }

    #[tokio::test]
    async fn test_missing_and_malformed() {
        let (_, _, guard) = guard();
        assert_eq!(
            guard.authenticate(&RequestHeaders::default()).await,
            Err(AuthError::TokenMissing)
        );
        assert_eq!(
            guard.authenticate(&bearer("garbage")).await,
            Err(AuthError::TokenMalformed)
        );
    }

    #[tokio::test]
    async fn test_blacklisted_token_is_refused_while_still_valid() {
        let (tokens, blacklist, guard) = guard();
        let token = tokens.issue(Id::new_v4(), vec![], vec![]).unwrap();
        blacklist.add(&token, Duration::from_secs(60)).await.unwrap();

        assert!(tokens.validate(&token).is_ok());
        assert_eq!(
            guard.authenticate(&bearer(&token)).await,
            Err(AuthError::TokenBlacklisted)
        );
    }

    #[tokio::test]
    async fn test_expired_token() {
        let (_, _, guard) = guard();
        let stale = TokenService::new(b"guard-test-secret-32-bytes-long!", -5);
        let token = stale.issue(Id::new_v4(), vec![], vec![]).unwrap();
        assert_eq!(
            guard.authenticate(&bearer(&token)).await,
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_request_headers() {
        let headers = RequestHeaders::from_pairs(&[
            ("cookie".to_string(), "a=1".to_string()),
            ("Cookie".to_string(), "sso_session=xyz".to_string()),
            ("X-Other".to_string(), "ignored".to_string()),
        ]);
        assert!(headers.authorization.is_none());
        assert_eq!(headers.cookie_value("a").as_deref(), Some("1"));
        assert_eq!(headers.cookie_value("sso_session").as_deref(), Some("xyz"));
    }
}
