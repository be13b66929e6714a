//! Token auth handlers
//!
//! Routes under `/api/v1/auth` used by first-party frontends.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use sa_models::{
    ForgotPasswordRequest, LoginRequest, ResendVerificationRequest, ResetPasswordRequest,
};

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser, LoginAttempt, ValidJson};
use crate::response::{ok, ok_empty};

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    _attempt: LoginAttempt,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.auth.login(&req.email, &req.password).await?;
    Ok(ok("Login successful", session))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    state.auth.logout(&user.token).await?;
    Ok(ok_empty("Successfully logged out"))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let detail = state.auth.me(user.id).await?;
    Ok(ok("User information retrieved successfully", detail))
}

/// POST /api/v1/auth/password/forgot
///
/// Answers the same way whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    state.auth.forgot_password(&req.email).await?;
    Ok(ok_empty("Password reset link has been sent to your email"))
}

/// POST /api/v1/auth/password/reset
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .auth
        .reset_password(&req.token, &req.email, &req.password)
        .await?;
    Ok(ok_empty("Password has been successfully reset"))
}

/// GET /api/v1/auth/email/verify/:token
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.auth.verify_email(&token).await?;
    Ok(ok_empty("Email verified successfully"))
}

/// POST /api/v1/auth/email/resend
pub async fn resend_verification(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidJson(req): ValidJson<ResendVerificationRequest>,
) -> ApiResult<impl IntoResponse> {
    state.auth.resend_verification_email(&req.email).await?;
    Ok(ok_empty("Verification link has been sent to your email"))
}
