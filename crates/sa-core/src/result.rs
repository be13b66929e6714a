//! Result type aliases

use crate::error::AuthError;

/// Standard Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
