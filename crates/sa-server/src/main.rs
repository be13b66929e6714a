//! SuperApp RS auth gateway
//!
//! Wires configuration, Postgres, Redis and mail delivery into the API
//! router and serves it until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sa_api::{AppState, Backends};
use sa_auth::{CredentialVerifier, GoogleIdentityProvider, IdentityProvider};
use sa_core::config::AppConfig;
use sa_db::{
    Database, PgOAuthClientRepository, PgPasswordResetRepository, PgProfileRepository,
    PgUserRepository, PoolSettings,
};
use sa_kv::{KvStore, RedisStore};
use sa_notifications::ConsoleEmailSender;

mod health;

use health::{HealthState, PostgresProbe, ReadinessCheck, RedisProbe};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().context("invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting SuperApp RS auth gateway"
    );

    let db = Database::connect(&PoolSettings::from_app(&config.database))
        .await
        .context("failed to connect to database")?;
    let kv: Arc<dyn KvStore> = Arc::new(
        RedisStore::connect(&config.redis.url)
            .await
            .context("failed to connect to redis")?,
    );

    let google: Option<Arc<dyn IdentityProvider>> = match config.google {
        Some(ref google) => {
            let redirect = format!("{}/api/v1/auth/google/callback", config.urls.app_url);
            info!("Google sign-in enabled");
            Some(Arc::new(GoogleIdentityProvider::new(google, &redirect)?))
        }
        None => None,
    };

    let pool = db.pool().clone();
    let backends = Backends {
        users: Arc::new(PgUserRepository::new(pool.clone())),
        resets: Arc::new(PgPasswordResetRepository::new(pool.clone())),
        profiles: Arc::new(PgProfileRepository::new(pool.clone())),
        clients: Arc::new(PgOAuthClientRepository::new(pool)),
        store: kv.clone(),
        email: Arc::new(ConsoleEmailSender::new()),
        verifier: CredentialVerifier::new(),
        google,
    };

    let addr = config.server_addr();
    let state = AppState::new(config, backends);
    let health = HealthState {
        readiness: Arc::new(
            ReadinessCheck::default()
                .with_probe(PostgresProbe(db.clone()))
                .with_probe(RedisProbe(kv)),
        ),
    };

    let app = build_router(state, health);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,sa_server=debug,sa_api=debug,sa_auth=debug,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

fn build_router(state: AppState, health_state: HealthState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(health_state);

    Router::new()
        .merge(health_routes)
        .merge(sa_api::router().with_state(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use sa_db::{MemoryOAuthClients, MemoryPasswordResets, MemoryProfiles, MemoryUserDirectory};
    use sa_kv::MemoryStore;
    use sa_notifications::RecordingEmailSender;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let state = AppState::new(
            AppConfig::default(),
            Backends {
                users: Arc::new(MemoryUserDirectory::new()),
                resets: Arc::new(MemoryPasswordResets::new()),
                profiles: Arc::new(MemoryProfiles::new()),
                clients: Arc::new(MemoryOAuthClients::new()),
                store: kv.clone(),
                email: Arc::new(RecordingEmailSender::new()),
                verifier: CredentialVerifier::with_params(8, 1, 1).unwrap(),
                google: None,
            },
        );
        let health = HealthState {
            readiness: Arc::new(ReadinessCheck::default().with_probe(RedisProbe(kv))),
        };
        build_router(state, health)
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = test_app();

        for uri in ["/health", "/health/live"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(Request::builder().uri("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report["ready"], true);
        assert_eq!(report["checks"][0]["name"], "redis");
        assert_eq!(report["checks"][0]["status"], "up");
    }

    #[tokio::test]
    async fn test_api_is_mounted() {
        let app = test_app();

        let response = app
            .oneshot(Request::builder().uri("/api/v1/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_google_routes_without_provider() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/google/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
