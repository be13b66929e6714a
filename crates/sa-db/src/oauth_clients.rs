//! OAuth client repository
//!
//! Table: m_oauth_client

use async_trait::async_trait;
use sa_models::OAuthClient;
use sqlx::{FromRow, PgPool};

use crate::repository::{OAuthClientStore, RepositoryResult};

#[derive(Debug, Clone, FromRow)]
struct OAuthClientRow {
    id: String,
    name: String,
    secret: String,
    redirect: String,
}

pub struct PgOAuthClientRepository {
    pool: PgPool,
}

impl PgOAuthClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OAuthClientStore for PgOAuthClientRepository {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<OAuthClient>> {
        let row = sqlx::query_as::<_, OAuthClientRow>(
            "SELECT id, name, secret, redirect FROM m_oauth_client WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| OAuthClient::new(r.id, r.name, r.secret, r.redirect)))
    }
}
