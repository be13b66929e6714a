//! Postgres pool
//!
//! Login and token checks sit on the request path, so acquiring a
//! connection is bounded tightly and a failure surfaces as a 500 instead of
//! a hung request.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Pool sizing and timeouts
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    /// Connections idle longer than this are closed
    pub idle_timeout: Duration,
}

impl PoolSettings {
    /// Settings for `DATABASE_URL` / `DATABASE_POOL_SIZE`
    pub fn from_app(config: &sa_core::config::DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.pool_size.max(1),
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Shared handle to the Postgres pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(settings: &PoolSettings) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections.min(settings.max_connections))
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .connect(&settings.url)
            .await?;

        tracing::info!(
            max_connections = settings.max_connections,
            "Postgres pool ready"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round trip used by the readiness probe
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Postgres pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_app() {
        let app = sa_core::config::DatabaseConfig {
            url: "postgres://superapp:secret@db/superapp".to_string(),
            pool_size: 4,
        };
        let settings = PoolSettings::from_app(&app);
        assert_eq!(settings.url, "postgres://superapp:secret@db/superapp");
        assert_eq!(settings.max_connections, 4);
        assert_eq!(settings.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_pool_size_still_gets_a_connection() {
        let app = sa_core::config::DatabaseConfig {
            url: "postgres://localhost/superapp".to_string(),
            pool_size: 0,
        };
        assert_eq!(PoolSettings::from_app(&app).max_connections, 1);
    }
}
