//! # sa-auth
//!
//! Authentication and authorization for SuperApp RS.
//!
//! ## Features
//!
//! - Argon2 credential verification
//! - HS256 JWT issuance, validation and revocation
//! - CSRF tokens for the server-rendered login form
//! - SSO cookie bridge shared by internal applications
//! - Authorization-code provider for relying applications
//! - Google sign-in
//! - Login rate limiting and role/permission rules

pub mod blacklist;
pub mod cookie;
pub mod csrf;
pub mod google;
pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod password;
pub mod permissions;
pub mod rate_limit;
pub mod service;
pub mod sso;

pub use blacklist::TokenBlacklist;
pub use cookie::{extract_cookie, random_hex_token, random_token, CookieConfig, CSRF_COOKIE, SSO_COOKIE};
pub use csrf::{CsrfManager, CsrfSession};
pub use google::{FederatedProfile, FederationError, GoogleIdentityProvider, IdentityProvider};
pub use jwt::{extract_bearer_token, Claims, TokenError, TokenService};
pub use middleware::{BearerGuard, RequestHeaders};
pub use oauth::{hashed_client, OAuthError, OAuthProvider};
pub use password::{CredentialVerifier, PasswordError};
pub use permissions::{AccessRule, CurrentUser, Requirement};
pub use rate_limit::LoginRateLimiter;
pub use service::{AuthService, AuthServiceDeps};
pub use sa_core::{AuthError, AuthResult};
pub use sso::{SsoBridge, SsoRejection};
