//! Core error types for SuperApp RS
//!
//! Every failure the authentication core can report to a caller is one
//! variant of [`AuthError`]. Messages are safe to show to end users; they
//! never reveal whether an account exists or why a token was rejected in
//! more detail than the variant itself.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Error taxonomy for authentication, session and OAuth operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("please verify your email address, a new verification link has been sent")]
    UnverifiedAccount,

    #[error("email not registered")]
    EmailNotRegistered,

    #[error("authentication required")]
    TokenMissing,

    #[error("token has expired")]
    TokenExpired,

    #[error("token has been invalidated")]
    TokenBlacklisted,

    #[error("invalid token")]
    TokenMalformed,

    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("invalid csrf token")]
    CsrfInvalid,

    #[error("invalid client")]
    InvalidClient,

    #[error("invalid grant")]
    InvalidGrant,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("email already verified")]
    AlreadyVerified,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("too many requests, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn internal(err: impl fmt::Display) -> Self {
        AuthError::Internal(err.to_string())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        AuthError::InvalidRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AuthError::Forbidden(msg.into())
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidCredentials
            | AuthError::EmailNotRegistered
            | AuthError::TokenMissing
            | AuthError::TokenExpired
            | AuthError::TokenBlacklisted
            | AuthError::TokenMalformed
            | AuthError::InvalidClient => 401,
            AuthError::UnverifiedAccount | AuthError::CsrfInvalid | AuthError::Forbidden(_) => 403,
            AuthError::InvalidGrant
            | AuthError::InvalidRequest(_)
            | AuthError::AlreadyVerified => 400,
            AuthError::NotFound { .. } => 404,
            AuthError::InvalidOrExpiredToken | AuthError::Validation(_) => 422,
            AuthError::RateLimited { .. } => 429,
            AuthError::Internal(_) => 500,
        }
    }

    /// Machine-readable error code, OAuth2 style for grant errors
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UnverifiedAccount => "unverified_account",
            AuthError::EmailNotRegistered => "email_not_registered",
            AuthError::TokenMissing => "token_missing",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenBlacklisted => "token_blacklisted",
            AuthError::TokenMalformed => "token_malformed",
            AuthError::InvalidOrExpiredToken => "invalid_token",
            AuthError::CsrfInvalid => "csrf_invalid",
            AuthError::InvalidClient => "invalid_client",
            AuthError::InvalidGrant => "invalid_grant",
            AuthError::InvalidRequest(_) => "invalid_request",
            AuthError::AlreadyVerified => "already_verified",
            AuthError::Forbidden(_) => "forbidden",
            AuthError::NotFound { .. } => "not_found",
            AuthError::RateLimited { .. } => "rate_limited",
            AuthError::Validation(_) => "validation_failed",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to return to the client.
    ///
    /// Internal errors are logged by the caller and replaced by a fixed text.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        AuthError::Validation(errors)
    }
}

/// Validation errors collection
#[derive(Error, Debug, Default, Clone, PartialEq, Eq)]
#[error("{}", self.full_messages().join(", "))]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> messages
    pub errors: HashMap<String, Vec<String>>,
    /// Errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Ok when empty, otherwise the collected errors
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        let mut fields: Vec<_> = self.errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, field_messages) in fields {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }
}
