//! Repository traits
//!
//! The authentication core only talks to these traits; Postgres and
//! in-memory implementations live next to them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sa_core::AuthError;
use sa_models::{EmployeeDetail, Id, OAuthClient, PasswordReset, StudentDetail, User};

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        AuthError::internal(err)
    }
}

/// Principal lookup and the two mutations the core performs on principals
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user (with roles and permissions) by email
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Find a user (with roles and permissions) by id
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>>;

    /// Store a new password hash and flag the password as changed
    async fn update_password(&self, id: Id, password_hash: &str) -> RepositoryResult<()>;

    /// Set the email verification timestamp
    async fn mark_email_verified(&self, id: Id, at: DateTime<Utc>) -> RepositoryResult<()>;
}

/// Password reset tokens, at most one per email
#[async_trait]
pub trait PasswordResetStore: Send + Sync {
    /// Delete any token for the email, then insert the new one
    async fn replace(&self, reset: &PasswordReset) -> RepositoryResult<()>;

    /// Find the row matching both token and email
    async fn find(&self, token: &str, email: &str) -> RepositoryResult<Option<PasswordReset>>;

    /// Delete a token
    async fn delete(&self, token: &str) -> RepositoryResult<()>;
}

/// Registered OAuth clients
#[async_trait]
pub trait OAuthClientStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<OAuthClient>>;
}

/// Employee and student profile lookup
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn employee_by_user(&self, user_id: Id) -> RepositoryResult<Option<EmployeeDetail>>;

    async fn student_by_user(&self, user_id: Id) -> RepositoryResult<Option<StudentDetail>>;
}
