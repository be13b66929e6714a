//! Role and permission guard for Bearer-protected routes
//!
//! ```ignore
//! let rule: AccessRule = "role:admin|permission:edit-major".parse()?;
//! Router::new()
//!     .route("/majors", post(create_major))
//!     .route_layer(middleware::from_fn_with_state(
//!         AccessGuard::new(state.clone(), rule),
//!         require_access,
//!     ))
//! ```

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use sa_auth::AccessRule;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

#[derive(Clone)]
pub struct AccessGuard {
    state: AppState,
    rule: Arc<AccessRule>,
}

impl AccessGuard {
    pub fn new(state: AppState, rule: AccessRule) -> Self {
        Self {
            state,
            rule: Arc::new(rule),
        }
    }
}

impl FromRef<AccessGuard> for AppState {
    fn from_ref(guard: &AccessGuard) -> Self {
        guard.state.clone()
    }
}

/// Middleware: 401 without a valid Bearer token, 403 when no alternative of
/// the rule is met. The authenticated user is left in the request
/// extensions for the handler.
pub async fn require_access(
    State(guard): State<AccessGuard>,
    AuthenticatedUser(user): AuthenticatedUser,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    guard.rule.authorize(&user)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
