//! Axum extractors for API handlers

use axum::{
    async_trait,
    extract::{
        rejection::JsonRejection, ConnectInfo, FromRef, FromRequest, FromRequestParts, OriginalUri,
        Request,
    },
    http::{header, request::Parts, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use sa_auth::{
    AuthService, AuthServiceDeps, BearerGuard, CredentialVerifier, CsrfManager, CurrentUser,
    IdentityProvider, LoginRateLimiter, OAuthProvider, RequestHeaders, SsoBridge, SsoRejection,
    TokenBlacklist, TokenService, CSRF_COOKIE, SSO_COOKIE,
};
use sa_core::config::AppConfig;
use sa_db::{OAuthClientStore, PasswordResetStore, ProfileDirectory, UserDirectory};
use sa_kv::KvStore;
use sa_models::{requests::validate_request, LoginResponse};
use sa_notifications::{AuthMailer, EmailAddress, EmailSender};
use serde::de::DeserializeOwned;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::redirects::login_url;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub guard: BearerGuard,
    pub csrf: CsrfManager,
    pub sso: SsoBridge,
    pub oauth: OAuthProvider,
    pub rate_limiter: LoginRateLimiter,
    /// Google sign-in, absent when not configured
    pub google: Option<Arc<dyn IdentityProvider>>,
}

/// Storage and delivery backends the state is assembled from
pub struct Backends {
    pub users: Arc<dyn UserDirectory>,
    pub resets: Arc<dyn PasswordResetStore>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub clients: Arc<dyn OAuthClientStore>,
    pub store: Arc<dyn KvStore>,
    pub email: Arc<dyn EmailSender>,
    pub verifier: CredentialVerifier,
    pub google: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    pub fn new(config: AppConfig, backends: Backends) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config));
        let blacklist = TokenBlacklist::new(backends.store.clone());
        let mailer = AuthMailer::new(
            EmailAddress::new(&config.email.from_address).with_name(&config.email.from_name),
            &config.urls.app_url,
            &config.urls.frontend_url,
        );

        let auth = AuthService::new(AuthServiceDeps {
            users: backends.users,
            resets: backends.resets,
            profiles: backends.profiles,
            store: backends.store.clone(),
            tokens: tokens.clone(),
            verifier: backends.verifier.clone(),
            mailer,
            email: backends.email,
        });

        Self {
            guard: BearerGuard::new(tokens.clone(), blacklist.clone()),
            csrf: CsrfManager::from_config(backends.store.clone(), &config),
            sso: SsoBridge::from_config(backends.store.clone(), tokens, blacklist, &config),
            oauth: OAuthProvider::new(backends.clients, backends.store.clone(), backends.verifier),
            rate_limiter: LoginRateLimiter::from_config(backends.store, &config),
            google: backends.google,
            auth,
            config: Arc::new(config),
        }
    }
}

/// Authorization and Cookie headers of a request
pub fn request_headers(headers: &HeaderMap) -> RequestHeaders {
    let pairs: Vec<(String, String)> = [header::AUTHORIZATION, header::COOKIE]
        .iter()
        .flat_map(|name| {
            headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(move |v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    RequestHeaders::from_pairs(&pairs)
}

pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    request_headers(headers).cookie_value(name)
}

/// Bearer-authenticated user
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let user = app_state
            .guard
            .authenticate(&request_headers(&parts.headers))
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, path = %parts.uri.path(), "Bearer authentication failed");
                ApiError::from(e)
            })?;
        Ok(AuthenticatedUser(user))
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Browser signed in through the SSO cookie.
///
/// Without a usable session the browser is sent to the login page with the
/// requested URI as `return_to`.
pub struct SsoUser(pub LoginResponse);

#[async_trait]
impl<S> FromRequestParts<S> for SsoUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let headers = request_headers(&parts.headers);
        let sso_cookie = headers.cookie_value(SSO_COOKIE);

        let rejection = match app_state.sso.resolve(sso_cookie.as_deref()).await {
            Ok(session) => return Ok(SsoUser(session)),
            Err(rejection) => rejection,
        };

        Err(redirect_to_login(&app_state, &headers, &requested_uri(parts), rejection).await)
    }
}

/// Send a browser without a usable SSO session to the login page.
///
/// The requested URI is staged under the browser's CSRF session and also
/// passed along as `return_to`. A stale SSO cookie is cleared.
pub async fn redirect_to_login(
    state: &AppState,
    headers: &RequestHeaders,
    requested: &str,
    rejection: SsoRejection,
) -> Response {
    tracing::debug!(reason = %rejection, uri = %requested, "SSO session rejected");

    if let Some(sid) = headers.cookie_value(CSRF_COOKIE) {
        if let Err(e) = state.sso.stage_return_to(&sid, requested).await {
            tracing::warn!(error = %e, "Failed to stage return_to");
        }
    }

    let banner = match rejection {
        SsoRejection::Blacklisted => Some("Session has been invalidated, please log in again"),
        SsoRejection::InvalidToken => Some("Session expired, please log in again"),
        SsoRejection::Corrupt => Some("Failed to parse user data"),
        _ => None,
    };
    let redirect = Redirect::to(&login_url(Some(requested), banner));

    match headers.cookie_value(SSO_COOKIE) {
        Some(stale) => {
            let clear = state.sso.clear(Some(&stale)).await;
            (AppendHeaders([(header::SET_COOKIE, clear)]), redirect).into_response()
        }
        None => redirect.into_response(),
    }
}

impl std::ops::Deref for SsoUser {
    type Target = LoginResponse;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Path and query of the request as the client sent it, before nesting
pub fn requested_uri(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri)
        .unwrap_or(&parts.uri);
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// Client address used for rate limiting.
///
/// The connecting peer, unless it is a trusted proxy. Behind a trusted
/// proxy the X-Forwarded-For chain is read from the right and the first
/// hop that is not itself a trusted proxy wins, then X-Real-IP.
pub fn client_ip(parts: &Parts, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
    else {
        return "unknown".to_string();
    };
    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    let forwarded = parts
        .headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>();
    if let Some(hop) = forwarded
        .iter()
        .rev()
        .find(|hop| !matches!(hop.parse::<IpAddr>(), Ok(ip) if trusted_proxies.contains(&ip)))
    {
        return match hop.parse::<IpAddr>() {
            Ok(ip) => ip.to_string(),
            Err(_) => peer.to_string(),
        };
    }

    parts
        .headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .unwrap_or(peer)
        .to_string()
}

/// Counts a login attempt against the caller's address.
///
/// Rejects with 429 and `Retry-After` once the window is exhausted.
pub struct LoginAttempt;

#[async_trait]
impl<S> FromRequestParts<S> for LoginAttempt
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let ip = client_ip(parts, &app_state.config.server.trusted_proxies);
        app_state.rate_limiter.check(&ip).await?;
        Ok(LoginAttempt)
    }
}

/// JSON body that has passed its validation rules
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ApiError::bad_request(e.body_text()))?;
        validate_request(&value).map_err(|e| ApiError::from(sa_core::AuthError::from(e)))?;
        Ok(ValidJson(value))
    }
}
