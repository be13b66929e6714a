//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::extractors::AppState;
use crate::handlers::{auth, google, oauth};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_router())
}

fn api_v1_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(oauth::login_page))
        .nest("/auth", auth_router())
        .nest("/oauth", oauth_router())
}

fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/google/login", get(google::google_login))
        .route("/google/callback", get(google::google_callback))
        .route("/password/forgot", post(auth::forgot_password))
        .route("/password/reset", post(auth::reset_password))
        .route("/email/verify/:token", get(auth::verify_email))
        .route("/email/resend", post(auth::resend_verification))
}

fn oauth_router() -> Router<AppState> {
    Router::new()
        .route("/authorize", get(oauth::authorize))
        .route("/token", post(oauth::token))
        .route("/login", get(oauth::login_page).post(oauth::login_submit))
        .route("/logout", get(oauth::logout))
        .route("/session", get(oauth::session))
}
