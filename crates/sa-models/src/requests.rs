//! Request bodies accepted by the auth endpoints

use serde::Deserialize;
use validator::Validate;

use sa_core::ValidationErrors;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Server-rendered login form
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
    #[serde(default)]
    pub return_to: String,
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub token: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "does not match password"))]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

/// Run derive validation and convert the result into core validation errors
pub fn validate_request<T: Validate>(request: &T) -> Result<(), ValidationErrors> {
    let Err(errors) = request.validate() else {
        return Ok(());
    };

    let mut out = ValidationErrors::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            out.add(field.to_string(), message);
        }
    }
    out.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validation() {
        let ok = LoginRequest {
            email: "alice@example.com".into(),
            password: "pw".into(),
        };
        assert!(validate_request(&ok).is_ok());

        let bad = LoginRequest {
            email: "not-an-email".into(),
            password: String::new(),
        };
        let errors = validate_request(&bad).unwrap_err();
        assert!(errors.has_error("email"));
        assert!(errors.has_error("password"));
    }

    #[test]
    fn test_reset_password_confirmation_must_match() {
        let req = ResetPasswordRequest {
            token: "t".into(),
            email: "alice@example.com".into(),
            password: "new-password".into(),
            password_confirmation: "other-password".into(),
        };
        let errors = validate_request(&req).unwrap_err();
        assert!(errors.has_error("password_confirmation"));
        assert!(!errors.has_error("password"));
    }
}
