//! User, role and permission models
//!
//! Tables: m_user, roles, permissions, model_has_roles, role_has_permissions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::Id;

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
        }
    }

    /// Parse the database representation, unknown values are inactive
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("ACTIVE") {
            UserStatus::Active
        } else {
            UserStatus::Inactive
        }
    }
}

/// A principal that can sign in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Salted adaptive hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub status: UserStatus,
    pub gender: Option<String>,
    pub religion: Option<String>,
    pub birth_place: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub nationality: Option<String>,
    pub img_path: Option<String>,
    pub img_name: Option<String>,
    pub is_change_password: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    /// Minimal active user, mostly useful for seeding and tests
    pub fn new(name: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Id::new_v4(),
            name: name.into(),
            email: email.into(),
            email_verified_at: None,
            password_hash: password_hash.into(),
            status: UserStatus::Active,
            gender: None,
            religion: None,
            birth_place: None,
            birth_date: None,
            phone_number: None,
            address: None,
            nationality: None,
            img_path: None,
            img_name: None,
            is_change_password: false,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            deleted_at: None,
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }

    pub fn verified(mut self) -> Self {
        self.email_verified_at = Some(Utc::now());
        self
    }

    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    /// Role names in assignment order
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }

    /// Union of the permission names over all roles, each name once
    pub fn permission_names(&self) -> Vec<String> {
        self.roles
            .iter()
            .flat_map(|r| r.permissions.iter().map(|p| p.name.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Named bundle of permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::new_v4(),
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permissions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = names.into_iter().map(Permission::new).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Id,
    pub name: String,
}

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::new_v4(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_names_are_deduplicated() {
        let user = User::new("Alice", "alice@x", "hash").with_roles(vec![
            Role::new("admin").with_permissions(["edit-major", "view-major"]),
            Role::new("lecturer").with_permissions(["view-major", "edit-class"]),
        ]);

        assert_eq!(user.role_names(), vec!["admin", "lecturer"]);
        assert_eq!(
            user.permission_names(),
            vec!["edit-class", "edit-major", "view-major"]
        );
    }

    #[test]
    fn test_user_without_roles() {
        let user = User::new("Bob", "bob@x", "hash");
        assert!(user.role_names().is_empty());
        assert!(user.permission_names().is_empty());
        assert!(!user.is_email_verified());
        assert!(user.verified().is_email_verified());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("Alice", "alice@x", "$argon2id$secret");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_status_from_db() {
        assert_eq!(UserStatus::from_db("ACTIVE"), UserStatus::Active);
        assert_eq!(UserStatus::from_db("INACTIVE"), UserStatus::Inactive);
        assert_eq!(UserStatus::Active.as_str(), "ACTIVE");
    }
}
