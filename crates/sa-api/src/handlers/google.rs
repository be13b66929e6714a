//! Google sign-in handlers
//!
//! The flow start remembers a random state and the caller's origin in two
//! cookies scoped to the callback path. The callback always lands the
//! browser on `<origin>/auth/callback`, with either the session or an error.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use sa_auth::{random_token, CookieConfig};
use sa_core::AuthError;
use sa_models::LoginResponse;
use serde::Deserialize;
use url::Url;

use crate::error::ApiResult;
use crate::extractors::{cookie, AppState};
use crate::redirects::origin_of;

pub const CALLBACK_PATH: &str = "/api/v1/auth/google/callback";
pub const STATE_COOKIE: &str = "oauth_state";
pub const ORIGIN_COOKIE: &str = "oauth_origin";
const FLOW_TTL_SECONDS: u64 = 3600;
const FRONTEND_CALLBACK: &str = "/auth/callback";

fn flow_cookie(state: &AppState, name: &str) -> CookieConfig {
    CookieConfig::new(name)
        .with_path(CALLBACK_PATH)
        .with_secure(state.config.auth.cookie_secure)
        .with_max_age(FLOW_TTL_SECONDS)
}

/// Origin a sign-in result may be delivered to, falling back to the frontend
fn trusted_origin(state: &AppState, candidate: Option<&str>) -> String {
    let trusted = state.config.trusted_origins();
    candidate
        .and_then(origin_of)
        .filter(|origin| {
            trusted
                .iter()
                .any(|t| origin_of(t).as_deref() == Some(origin.as_str()))
        })
        .unwrap_or_else(|| state.config.urls.frontend_url.clone())
}

/// GET /api/v1/auth/google/login
pub async fn google_login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let provider = state
        .google
        .clone()
        .ok_or(AuthError::NotFound { entity: "google sign-in" })?;

    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok());
    let origin = trusted_origin(&state, referer);
    let flow_state = random_token();

    tracing::debug!(origin = %origin, "Starting Google sign-in");
    Ok((
        AppendHeaders([
            (
                header::SET_COOKIE,
                flow_cookie(&state, STATE_COOKIE).build_cookie(&flow_state),
            ),
            (
                header::SET_COOKIE,
                flow_cookie(&state, ORIGIN_COOKIE).build_cookie(&origin),
            ),
        ]),
        Redirect::temporary(&provider.authorize_url(&flow_state)),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    /// Set by Google when the user declined consent
    pub error: Option<String>,
}

/// GET /api/v1/auth/google/callback
pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let origin = trusted_origin(&state, cookie(&headers, ORIGIN_COOKIE).as_deref());
    let outcome = complete_sign_in(&state, &headers, params).await;

    let target = match &outcome {
        Ok(session) => session_redirect(&origin, session),
        Err(message) => {
            tracing::info!(reason = %message, "Google sign-in failed");
            error_redirect(&origin, message)
        }
    };

    (
        AppendHeaders([
            (
                header::SET_COOKIE,
                flow_cookie(&state, STATE_COOKIE).build_clear_cookie(),
            ),
            (
                header::SET_COOKIE,
                flow_cookie(&state, ORIGIN_COOKIE).build_clear_cookie(),
            ),
        ]),
        Redirect::temporary(&target),
    )
        .into_response()
}

async fn complete_sign_in(
    state: &AppState,
    headers: &HeaderMap,
    params: CallbackParams,
) -> Result<LoginResponse, String> {
    let provider = state
        .google
        .as_ref()
        .ok_or_else(|| "Google sign-in is not configured".to_string())?;

    let expected = cookie(headers, STATE_COOKIE).ok_or_else(|| "State cookie not found".to_string())?;
    if params.state.as_deref() != Some(expected.as_str()) {
        return Err("Invalid state parameter".to_string());
    }
    if let Some(error) = params.error {
        return Err(format!("Google sign-in was not completed: {}", error));
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| "Missing authorization code".to_string())?;

    let profile = provider
        .fetch_profile(&code)
        .await
        .map_err(|e| e.to_string())?;

    state
        .auth
        .login_with_google(&profile)
        .await
        .map_err(|e| e.public_message())
}

fn callback_url(origin: &str, pairs: &[(&str, &str)]) -> String {
    let base = format!("{}{}", origin, FRONTEND_CALLBACK);
    match Url::parse(&base) {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(pairs);
            url.to_string()
        }
        Err(_) => FRONTEND_CALLBACK.to_string(),
    }
}

fn session_redirect(origin: &str, session: &LoginResponse) -> String {
    let user = serde_json::to_vec(&session.user).unwrap_or_default();
    callback_url(
        origin,
        &[
            ("token", session.token.as_str()),
            ("user", URL_SAFE.encode(user).as_str()),
        ],
    )
}

fn error_redirect(origin: &str, message: &str) -> String {
    callback_url(origin, &[("error", URL_SAFE.encode(message).as_str())])
}
