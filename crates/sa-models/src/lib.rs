//! # sa-models
//!
//! Domain models for SuperApp RS.
//!
//! Principals with their roles and permissions, the login payload shared by
//! tokens, SSO sessions and OAuth codes, profile views returned by `/me`,
//! registered OAuth clients, password reset rows and request bodies.

pub mod oauth;
pub mod password_reset;
pub mod profile;
pub mod requests;
pub mod session;
pub mod user;

pub use oauth::{AuthorizationCodeRecord, OAuthClient};
pub use password_reset::PasswordReset;
pub use profile::{EmployeeDetail, StudentDetail, StudentSemester, UserDetail};
pub use requests::{
    ForgotPasswordRequest, LoginForm, LoginRequest, ResendVerificationRequest,
    ResetPasswordRequest,
};
pub use session::{LoginResponse, UserLoginInfo};
pub use user::{Permission, Role, User, UserStatus};

/// Identifier type used for every persisted entity
pub type Id = uuid::Uuid;
