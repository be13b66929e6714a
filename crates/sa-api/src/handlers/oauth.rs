//! Authorization-code provider and SSO login handlers
//!
//! Relying applications send browsers to `/oauth/authorize`. Browsers
//! without an SSO session are sent through the server-rendered login form
//! and come back with their original request in `return_to`.

use axum::{
    extract::{rejection::FormRejection, OriginalUri, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form,
};
use sa_auth::{CSRF_COOKIE, SSO_COOKIE};
use sa_core::AuthError;
use sa_models::{requests::validate_request, LoginForm};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{redirect_to_login, request_headers, AppState, LoginAttempt, SsoUser};
use crate::redirects::{decode_banner, login_url, safe_redirect, with_query_param, LOGIN_PATH};
use crate::response::ok;
use crate::views::LoginPage;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthorizeParams {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: String,
}

/// Drop the SSO session and send the browser to the login page with a banner
async fn fail_authorize(state: &AppState, headers: &HeaderMap, requested: &str, message: &str) -> Response {
    let clear = state
        .sso
        .clear(request_headers(headers).cookie_value(SSO_COOKIE).as_deref())
        .await;
    (
        AppendHeaders([(header::SET_COOKIE, clear)]),
        Redirect::to(&login_url(Some(requested), Some(message))),
    )
        .into_response()
}

/// GET /api/v1/oauth/authorize
pub async fn authorize(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    let requested = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let client = match state
        .oauth
        .check_authorize_request(&params.client_id, &params.redirect_uri, &params.response_type)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            tracing::info!(client_id = %params.client_id, error = %e, "Authorization request refused");
            let message = match e {
                sa_auth::OAuthError::InvalidClient => "Invalid client or redirect URI",
                sa_auth::OAuthError::InvalidRequest(_) if !params.client_id.is_empty() && !params.redirect_uri.is_empty() => {
                    "Invalid client or redirect URI"
                }
                _ => "Invalid request parameters",
            };
            return fail_authorize(&state, &headers, &requested, message).await;
        }
    };

    let cookies = request_headers(&headers);
    let session = match state.sso.resolve(cookies.cookie_value(SSO_COOKIE).as_deref()).await {
        Ok(session) => session,
        Err(rejection) => return redirect_to_login(&state, &cookies, &requested, rejection).await,
    };

    let code = match state
        .oauth
        .issue_code(&client, &params.redirect_uri, &session)
        .await
    {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(client_id = %client.id, error = %e, "Failed to issue authorization code");
            return fail_authorize(&state, &headers, &requested, "Failed to generate authorization code").await;
        }
    };

    match with_query_param(&params.redirect_uri, "code", &code) {
        Some(target) => Redirect::to(&target).into_response(),
        None => fail_authorize(&state, &headers, &requested, "Invalid redirect URI").await,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenParams {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub code: String,
}

/// POST /api/v1/oauth/token
pub async fn token(
    State(state): State<AppState>,
    Form(params): Form<TokenParams>,
) -> ApiResult<impl IntoResponse> {
    let session = state
        .oauth
        .exchange(
            &params.client_id,
            &params.client_secret,
            &params.redirect_uri,
            &params.code,
        )
        .await?;
    Ok(ok("Token generated successfully", session))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginPageParams {
    pub return_to: String,
    pub error: Option<String>,
}

fn no_store() -> [(header::HeaderName, HeaderValue); 2] {
    [
        (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        (header::PRAGMA, HeaderValue::from_static("no-cache")),
    ]
}

fn post_login_target(state: &AppState, return_to: &str) -> String {
    safe_redirect(return_to, &state.config.trusted_origins()).unwrap_or_else(|| "/".to_string())
}

/// GET /api/v1/login and GET /api/v1/oauth/login
pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LoginPageParams>,
) -> ApiResult<Response> {
    let cookies = request_headers(&headers);

    if let Some(sso_cookie) = cookies.cookie_value(SSO_COOKIE) {
        if state.sso.resolve(Some(&sso_cookie)).await.is_ok() {
            let target = post_login_target(&state, &params.return_to);
            return Ok(Redirect::to(&target).into_response());
        }
    }

    let csrf = state
        .csrf
        .ensure_session(cookies.cookie_value(CSRF_COOKIE).as_deref());
    let csrf_token = state.csrf.issue_token(&csrf.sid).await?;
    let error = params.error.as_deref().and_then(decode_banner);

    let html = LoginPage {
        csrf_token: &csrf_token,
        return_to: &params.return_to,
        error: error.as_deref(),
    }
    .render();

    let mut response = (no_store(), axum::response::Html(html)).into_response();
    if let Some(set_cookie) = csrf.set_cookie {
        let value = HeaderValue::from_str(&set_cookie).map_err(AuthError::internal)?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

/// POST /api/v1/oauth/login
pub async fn login_submit(
    State(state): State<AppState>,
    _attempt: LoginAttempt,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        return Redirect::to(&login_url(None, Some("Invalid form data"))).into_response();
    };
    let back = |message: &str| Redirect::to(&login_url(Some(form.return_to.as_str()), Some(message))).into_response();

    if validate_request(&form).is_err() {
        return back("Invalid form data");
    }

    let cookies = request_headers(&headers);
    let sid = cookies.cookie_value(CSRF_COOKIE);
    if !state
        .csrf
        .validate(sid.as_deref(), Some(form.csrf_token.as_str()))
        .await
    {
        return back("Invalid CSRF token");
    }

    let session = match state.auth.login(&form.email, &form.password).await {
        Ok(session) => session,
        Err(AuthError::Internal(detail)) => {
            tracing::error!(error = %detail, "Login failed");
            return back("Login failed, please try again");
        }
        Err(e) => return back(&format!("Login failed: {}", e.public_message())),
    };

    let sso_cookie = match state.sso.establish(&session).await {
        Ok(cookie) => cookie,
        Err(e) => {
            tracing::error!(user_id = %session.user.id, error = %e, "Failed to establish SSO session");
            return back("Login failed, please try again");
        }
    };

    let staged = match sid.as_deref() {
        Some(sid) => state.sso.take_return_to(sid).await,
        None => None,
    };
    let trusted = state.config.trusted_origins();
    let target = safe_redirect(&form.return_to, &trusted)
        .or_else(|| staged.and_then(|s| safe_redirect(&s, &trusted)))
        .unwrap_or_else(|| "/".to_string());

    (
        no_store(),
        AppendHeaders([(header::SET_COOKIE, sso_cookie)]),
        Redirect::to(&target),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogoutParams {
    pub redirect: String,
}

/// GET /api/v1/oauth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LogoutParams>,
) -> Response {
    let clear = state
        .sso
        .clear(request_headers(&headers).cookie_value(SSO_COOKIE).as_deref())
        .await;
    let target = safe_redirect(&params.redirect, &state.config.trusted_origins())
        .unwrap_or_else(|| LOGIN_PATH.to_string());

    (
        AppendHeaders([(header::SET_COOKIE, clear)]),
        Redirect::to(&target),
    )
        .into_response()
}

/// GET /api/v1/oauth/session
pub async fn session(user: SsoUser) -> impl IntoResponse {
    ok("Session retrieved successfully", user.0.user)
}
