//! Login payload
//!
//! The same structure is returned by password login, Google login and the
//! OAuth token endpoint, and is what SSO sessions and authorization codes
//! carry in the key-value store.

use serde::{Deserialize, Serialize};

use crate::user::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserLoginInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoginInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_change_password: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl UserLoginInfo {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            is_change_password: user.is_change_password,
            roles: user.role_names(),
            permissions: user.permission_names(),
        }
    }
}

impl LoginResponse {
    pub fn new(token: impl Into<String>, user: &User) -> Self {
        Self {
            token: token.into(),
            user: UserLoginInfo::from_user(user),
        }
    }
}
