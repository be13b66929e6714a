//! Role and permission checks
//!
//! An access rule is a `|`-separated list of alternatives such as
//! `role:admin|permission:edit-major`. The caller passes when it holds any
//! one of them.

use sa_core::{AuthError, AuthResult};
use sa_models::Id;
use std::fmt;
use std::str::FromStr;

use crate::jwt::{Claims, TokenError};

/// Authenticated caller, built from validated token claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Id,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    /// The bearer token the request carried
    pub token: String,
}

impl CurrentUser {
    pub fn from_claims(claims: Claims, token: impl Into<String>) -> Result<Self, TokenError> {
        Ok(Self {
            id: claims.subject()?,
            roles: claims.roles,
            permissions: claims.permissions,
            token: token.into(),
        })
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Role(String),
    Permission(String),
}

impl Requirement {
    pub fn is_met_by(&self, user: &CurrentUser) -> bool {
        match self {
            Requirement::Role(name) => user.has_role(name),
            Requirement::Permission(name) => user.has_permission(name),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Role(name) => write!(f, "role:{}", name),
            Requirement::Permission(name) => write!(f, "permission:{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    alternatives: Vec<Requirement>,
}

impl AccessRule {
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            alternatives: vec![Requirement::Role(name.into())],
        }
    }

    pub fn permission(name: impl Into<String>) -> Self {
        Self {
            alternatives: vec![Requirement::Permission(name.into())],
        }
    }

    pub fn alternatives(&self) -> &[Requirement] {
        &self.alternatives
    }

    pub fn allows(&self, user: &CurrentUser) -> bool {
        self.alternatives.iter().any(|r| r.is_met_by(user))
    }

    pub fn authorize(&self, user: &CurrentUser) -> AuthResult<()> {
        if self.allows(user) {
            Ok(())
        } else {
            tracing::debug!(user_id = %user.id, rule = %self, "Access denied");
            Err(AuthError::forbidden("you do not have access to this resource"))
        }
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.alternatives.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join("|"))
    }
}

impl FromStr for AccessRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut alternatives = Vec::new();
        for part in s.split('|').map(str::trim) {
            let (kind, name) = part
                .split_once(':')
                .ok_or_else(|| format!("expected role:<name> or permission:<name>, got {:?}", part))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(format!("empty name in {:?}", part));
            }
            match kind.trim() {
                "role" => alternatives.push(Requirement::Role(name.to_string())),
                "permission" => alternatives.push(Requirement::Permission(name.to_string())),
                other => return Err(format!("unknown requirement kind {:?}", other)),
            }
        }
        Ok(Self { alternatives })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[&str], permissions: &[&str]) -> CurrentUser {
        CurrentUser {
            id: Id::new_v4(),
            roles: roles.iter().map(|s| s.to_string()).collect(),
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
            token: "t".into(),
        }
    }

    #[test]
    fn test_parse() {
        let rule: AccessRule = "role:admin|permission:edit-major".parse().unwrap();
        assert_eq!(
            rule.alternatives(),
            &[
                Requirement::Role("admin".into()),
                Requirement::Permission("edit-major".into())
            ]
        );
        assert_eq!(rule.to_string(), "role:admin|permission:edit-major");

        assert!("admin".parse::<AccessRule>().is_err());
        assert!("group:x".parse::<AccessRule>().is_err());
        assert!("role:".parse::<AccessRule>().is_err());
        assert!("".parse::<AccessRule>().is_err());
    }

    #[test]
    fn test_any_alternative_suffices() {
        let rule: AccessRule = "role:admin|permission:edit-major".parse().unwrap();

        assert!(rule.allows(&user(&["admin"], &[])));
        assert!(rule.allows(&user(&["lecturer"], &["edit-major"])));
        assert!(!rule.allows(&user(&["student"], &["view-major"])));
    }

    #[test]
    fn test_authorize() {
        let rule = AccessRule::permission("delete-student");
        assert!(rule.authorize(&user(&[], &["delete-student"])).is_ok());

        let err = rule.authorize(&user(&["admin"], &[])).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
