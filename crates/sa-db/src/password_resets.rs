//! Password reset repository
//!
//! Table: password_reset_tokens (email primary key)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sa_models::PasswordReset;
use sqlx::{FromRow, PgPool};

use crate::repository::{PasswordResetStore, RepositoryResult};

#[derive(Debug, Clone, FromRow)]
struct PasswordResetRow {
    email: String,
    token: String,
    created_at: DateTime<Utc>,
}

impl From<PasswordResetRow> for PasswordReset {
    fn from(row: PasswordResetRow) -> Self {
        PasswordReset {
            email: row.email,
            token: row.token,
            created_at: row.created_at,
        }
    }
}

pub struct PgPasswordResetRepository {
    pool: PgPool,
}

impl PgPasswordResetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordResetStore for PgPasswordResetRepository {
    async fn replace(&self, reset: &PasswordReset) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM password_reset_tokens WHERE email = $1")
            .bind(&reset.email)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (email, token, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&reset.email)
        .bind(&reset.token)
        .bind(reset.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, token: &str, email: &str) -> RepositoryResult<Option<PasswordReset>> {
        let row = sqlx::query_as::<_, PasswordResetRow>(
            r#"
            SELECT email, token, created_at
            FROM password_reset_tokens
            WHERE token = $1 AND email = $2
            "#,
        )
        .bind(token)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete(&self, token: &str) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
