//! JWT issuance and validation
//!
//! Tokens are HS256 only. A token whose header names any other algorithm is
//! rejected as an invalid signature, and expiry is checked without leeway.

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sa_core::AuthError;
use sa_models::Id;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn subject(&self) -> Result<Id, TokenError> {
        self.user_id.parse().map_err(|_| TokenError::Malformed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token is expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::InvalidSignature | TokenError::Malformed => AuthError::TokenMalformed,
            TokenError::Encoding(msg) => AuthError::Internal(msg),
        }
    }
}

/// Issues and validates bearer tokens with a shared secret
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &[u8], lifetime_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime_seconds,
        }
    }

    pub fn from_config(config: &sa_core::config::AppConfig) -> Self {
        Self::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.token_lifetime_hours * 3600,
        )
    }

    pub fn lifetime_seconds(&self) -> i64 {
        self.lifetime_seconds
    }

    pub fn issue(
        &self,
        user_id: Id,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: user_id.to_string(),
            roles,
            permissions,
            iat: now,
            exp: now + self.lifetime_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::Malformed,
            })
    }

    /// Time the token keeps validating, zero once expired.
    ///
    /// `validate` accepts a token through the whole second named by `exp`,
    /// so this runs to the end of that second.
    pub fn remaining(&self, claims: &Claims) -> Duration {
        remaining_at(claims.exp, Utc::now().timestamp_millis())
    }
}

fn remaining_at(exp: i64, now_millis: i64) -> Duration {
    let left = exp.saturating_add(1).saturating_mul(1000) - now_millis;
    Duration::from_millis(left.max(0) as u64)
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
