//! Auth service
//!
//! Login, logout, Google login, password reset, email verification and the
//! `/me` profile. Failure modes that could reveal whether an account exists
//! all collapse into the same error.

use chrono::Utc;
use sa_core::{AuthError, AuthResult};
use sa_db::{PasswordResetStore, ProfileDirectory, UserDirectory};
use sa_kv::{get_json, set_json, KvStore};
use sa_models::{Id, LoginResponse, PasswordReset, User, UserDetail};
use sa_notifications::{AuthMailer, EmailSender};
use std::sync::Arc;
use std::time::Duration;

use crate::blacklist::TokenBlacklist;
use crate::cookie::random_hex_token;
use crate::google::FederatedProfile;
use crate::jwt::TokenService;
use crate::password::CredentialVerifier;

pub const VERIFY_EMAIL_TTL: Duration = Duration::from_secs(15 * 60);
pub const PROFILE_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

fn verify_email_key(token: &str) -> String {
    format!("verify_email:{}", token)
}

fn profile_cache_key(user_id: Id) -> String {
    format!("user_info:{}", user_id)
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    resets: Arc<dyn PasswordResetStore>,
    profiles: Arc<dyn ProfileDirectory>,
    store: Arc<dyn KvStore>,
    tokens: Arc<TokenService>,
    blacklist: TokenBlacklist,
    verifier: CredentialVerifier,
    mailer: AuthMailer,
    email: Arc<dyn EmailSender>,
}

/// Collaborators of [`AuthService`]
pub struct AuthServiceDeps {
    pub users: Arc<dyn UserDirectory>,
    pub resets: Arc<dyn PasswordResetStore>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub store: Arc<dyn KvStore>,
    pub tokens: Arc<TokenService>,
    pub verifier: CredentialVerifier,
    pub mailer: AuthMailer,
    pub email: Arc<dyn EmailSender>,
}

impl AuthService {
    pub fn new(deps: AuthServiceDeps) -> Self {
        Self {
            blacklist: TokenBlacklist::new(deps.store.clone()),
            users: deps.users,
            resets: deps.resets,
            profiles: deps.profiles,
            store: deps.store,
            tokens: deps.tokens,
            verifier: deps.verifier,
            mailer: deps.mailer,
            email: deps.email,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    pub fn blacklist(&self) -> &TokenBlacklist {
        &self.blacklist
    }

    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<LoginResponse> {
        let Some(user) = self.users.find_by_email(email).await? else {
            self.verifier.verify_dummy(password);
            tracing::info!("Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verifier.verify(password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_email_verified() {
            tracing::info!(user_id = %user.id, "Login refused for unverified email");
            let service = self.clone();
            tokio::spawn(async move {
                if let Err(e) = service.send_verification(&user).await {
                    tracing::warn!(user_id = %user.id, error = %e, "Background verification email failed");
                }
            });
            return Err(AuthError::UnverifiedAccount);
        }

        self.issue_session(&user)
    }

    pub async fn login_with_google(&self, profile: &FederatedProfile) -> AuthResult<LoginResponse> {
        let user = self
            .users
            .find_by_email(&profile.email)
            .await?
            .ok_or(AuthError::EmailNotRegistered)?;
        self.issue_session(&user)
    }

    fn issue_session(&self, user: &User) -> AuthResult<LoginResponse> {
        let token = self
            .tokens
            .issue(user.id, user.role_names(), user.permission_names())?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginResponse::new(token, user))
    }

    /// Revoke a token; a token that no longer validates counts as logged out
    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        let claims = match self.tokens.validate(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Logout with invalid token");
                return Ok(());
            }
        };
        self.blacklist
            .add(token, self.tokens.remaining(&claims))
            .await?;
        tracing::info!(user_id = %claims.user_id, "User logged out");
        Ok(())
    }

    /// Always succeeds for unknown emails so callers cannot enumerate accounts
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = random_hex_token();
        self.resets
            .replace(&PasswordReset::new(user.email.clone(), token.clone()))
            .await?;

        let message = self.mailer.password_reset(&user.email, &user.name, &token);
        match self.email.send(&message).await {
            Ok(_) => tracing::info!(user_id = %user.id, "Password reset email sent"),
            Err(e) => tracing::error!(user_id = %user.id, error = %e, "Password reset email failed"),
        }
        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: &str,
        email: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let reset = self
            .resets
            .find(token, email)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        if reset.is_expired_at(Utc::now()) {
            self.resets.delete(token).await?;
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let Some(user) = self.users.find_by_email(email).await? else {
            self.resets.delete(token).await?;
            return Err(AuthError::InvalidOrExpiredToken);
        };

        let hash = self.verifier.hash(new_password)?;
        self.users.update_password(user.id, &hash).await?;
        self.resets.delete(token).await?;
        self.invalidate_profile(user.id).await;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> AuthResult<()> {
        let key = verify_email_key(token);
        let email = self
            .store
            .get(&key)
            .await
            .map_err(AuthError::internal)?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let Some(user) = self.users.find_by_email(&email).await? else {
            self.store.delete(&key).await.map_err(AuthError::internal)?;
            return Err(AuthError::InvalidOrExpiredToken);
        };

        self.users.mark_email_verified(user.id, Utc::now()).await?;
        self.store.delete(&key).await.map_err(AuthError::internal)?;
        self.invalidate_profile(user.id).await;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    pub async fn resend_verification_email(&self, email: &str) -> AuthResult<()> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::NotFound { entity: "user" })?;

        if user.is_email_verified() {
            return Err(AuthError::AlreadyVerified);
        }
        self.send_verification(&user).await
    }

    async fn send_verification(&self, user: &User) -> AuthResult<()> {
        let token = random_hex_token();
        self.store
            .set(&verify_email_key(&token), &user.email, Some(VERIFY_EMAIL_TTL))
            .await
            .map_err(AuthError::internal)?;

        let message = self.mailer.verify_email(&user.email, &user.name, &token);
        self.email.send(&message).await.map_err(AuthError::internal)?;

        tracing::info!(user_id = %user.id, "Verification email sent");
        Ok(())
    }

    /// Profile of the caller, cached for ten minutes
    pub async fn me(&self, user_id: Id) -> AuthResult<UserDetail> {
        let key = profile_cache_key(user_id);
        match get_json::<UserDetail>(self.store.as_ref(), &key).await {
            Ok(Some(detail)) => return Ok(detail),
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Profile cache read failed"),
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound { entity: "user" })?;

        let mut detail = UserDetail::from_user(&user);
        if detail.is_student() {
            detail.student_detail = self.profiles.student_by_user(user_id).await?;
        } else {
            detail.employee_detail = self.profiles.employee_by_user(user_id).await?;
        }

        if let Err(e) = set_json(self.store.as_ref(), &key, &detail, Some(PROFILE_CACHE_TTL)).await {
            tracing::warn!(user_id = %user_id, error = %e, "Profile cache write failed");
        }
        Ok(detail)
    }

    async fn invalidate_profile(&self, user_id: Id) {
        if let Err(e) = self.store.delete(&profile_cache_key(user_id)).await {
            tracing::warn!(user_id = %user_id, error = %e, "Profile cache invalidation failed");
        }
    }
}
