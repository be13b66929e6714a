//! API error handling
//!
//! Every failure is rendered as `{"message": ..., "errors": {"error": <code>}}`.
//! Internal details are logged, never returned.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sa_auth::OAuthError;
use sa_core::AuthError;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    /// Errors of the token endpoint, reported with their RFC 6749 code
    OAuth(OAuthError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::Auth(AuthError::InvalidRequest(msg.into()))
    }

    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::OAuth(OAuthError::InvalidClient) => 401,
            ApiError::OAuth(OAuthError::Store(_)) => 500,
            ApiError::OAuth(_) => 400,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        ApiError::OAuth(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    errors: Value,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (body, retry_after) = match &self {
            ApiError::Auth(AuthError::Internal(detail)) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    ErrorBody {
                        message: "internal server error".into(),
                        errors: json!({ "error": "internal_error" }),
                    },
                    None,
                )
            }
            ApiError::Auth(AuthError::Validation(errors)) => (
                ErrorBody {
                    message: errors.full_messages().join(", "),
                    errors: json!({ "error": "validation_failed", "fields": errors.errors }),
                },
                None,
            ),
            ApiError::Auth(err) => (
                ErrorBody {
                    message: err.public_message(),
                    errors: json!({ "error": err.error_code() }),
                },
                match err {
                    AuthError::RateLimited { retry_after_seconds } => Some(*retry_after_seconds),
                    _ => None,
                },
            ),
            ApiError::OAuth(OAuthError::Store(detail)) => {
                tracing::error!(error = %detail, "Token request failed");
                (
                    ErrorBody {
                        message: "internal server error".into(),
                        errors: json!({ "error": "server_error" }),
                    },
                    None,
                )
            }
            ApiError::OAuth(err) => (
                ErrorBody {
                    message: err.to_string(),
                    errors: json!({ "error": err.error_code() }),
                },
                None,
            ),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_auth_error_envelope() {
        let response = ApiError::from(AuthError::InvalidCredentials).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["message"], "invalid email or password");
        assert_eq!(body["errors"]["error"], "invalid_credentials");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = ApiError::from(AuthError::internal("pg: password auth failed")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "internal server error");
        assert!(!body.to_string().contains("pg:"));
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response =
            ApiError::from(AuthError::RateLimited { retry_after_seconds: 17 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "17");
    }

    #[tokio::test]
    async fn test_oauth_error_codes() {
        let response = ApiError::from(OAuthError::InvalidGrant("code expired")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["errors"]["error"], "invalid_grant");

        let response = ApiError::from(OAuthError::InvalidClient).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
