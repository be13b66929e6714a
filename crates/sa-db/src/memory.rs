//! In-memory repositories (for development/testing)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sa_models::{EmployeeDetail, Id, OAuthClient, PasswordReset, StudentDetail, User};
use std::collections::HashMap;

use crate::repository::{
    OAuthClientStore, PasswordResetStore, ProfileDirectory, RepositoryError, RepositoryResult,
    UserDirectory,
};

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Id, User>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.write().insert(user.id, user);
    }

    pub fn get(&self, id: Id) -> Option<User> {
        self.users.read().get(&id).cloned()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .read()
            .get(&id)
            .filter(|u| u.deleted_at.is_none())
            .cloned())
    }

    async fn update_password(&self, id: Id, password_hash: &str) -> RepositoryResult<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))?;
        user.password_hash = password_hash.to_string();
        user.is_change_password = true;
        user.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_email_verified(&self, id: Id, at: DateTime<Utc>) -> RepositoryResult<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))?;
        user.email_verified_at = Some(at);
        user.updated_at = Some(Utc::now());
        Ok(())
    }
}

/// Keyed by email, mirroring the table's primary key
#[derive(Default)]
pub struct MemoryPasswordResets {
    rows: RwLock<HashMap<String, PasswordReset>>,
}

impl MemoryPasswordResets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row as-is, bypassing the replace semantics
    pub fn insert(&self, reset: PasswordReset) {
        self.rows.write().insert(reset.email.clone(), reset);
    }

    pub fn get(&self, email: &str) -> Option<PasswordReset> {
        self.rows.read().get(email).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl PasswordResetStore for MemoryPasswordResets {
    async fn replace(&self, reset: &PasswordReset) -> RepositoryResult<()> {
        let mut rows = self.rows.write();
        rows.remove(&reset.email);
        rows.insert(reset.email.clone(), reset.clone());
        Ok(())
    }

    async fn find(&self, token: &str, email: &str) -> RepositoryResult<Option<PasswordReset>> {
        Ok(self
            .rows
            .read()
            .get(email)
            .filter(|r| r.token == token)
            .cloned())
    }

    async fn delete(&self, token: &str) -> RepositoryResult<()> {
        self.rows.write().retain(|_, r| r.token != token);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryOAuthClients {
    clients: RwLock<HashMap<String, OAuthClient>>,
}

impl MemoryOAuthClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, client: OAuthClient) {
        self.clients.write().insert(client.id.clone(), client);
    }
}

#[async_trait]
impl OAuthClientStore for MemoryOAuthClients {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<OAuthClient>> {
        Ok(self.clients.read().get(id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryProfiles {
    employees: RwLock<HashMap<Id, EmployeeDetail>>,
    students: RwLock<HashMap<Id, StudentDetail>>,
}

impl MemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_employee(&self, user_id: Id, detail: EmployeeDetail) {
        self.employees.write().insert(user_id, detail);
    }

    pub fn insert_student(&self, user_id: Id, detail: StudentDetail) {
        self.students.write().insert(user_id, detail);
    }
}

#[async_trait]
impl ProfileDirectory for MemoryProfiles {
    async fn employee_by_user(&self, user_id: Id) -> RepositoryResult<Option<EmployeeDetail>> {
        Ok(self.employees.read().get(&user_id).cloned())
    }

    async fn student_by_user(&self, user_id: Id) -> RepositoryResult<Option<StudentDetail>> {
        Ok(self.students.read().get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_keeps_one_token_per_email() {
        let resets = MemoryPasswordResets::new();
        resets.replace(&PasswordReset::new("alice@x", "t1")).await.unwrap();
        resets.replace(&PasswordReset::new("alice@x", "t2")).await.unwrap();

        assert_eq!(resets.len(), 1);
        assert!(resets.find("t1", "alice@x").await.unwrap().is_none());
        assert!(resets.find("t2", "alice@x").await.unwrap().is_some());
        assert!(resets.find("t2", "bob@x").await.unwrap().is_none());

        resets.delete("t2").await.unwrap();
        assert!(resets.is_empty());
    }

    #[tokio::test]
    async fn test_user_mutations() {
        let users = MemoryUserDirectory::new();
        let alice = User::new("Alice", "alice@x", "old");
        let id = alice.id;
        users.insert(alice);

        users.update_password(id, "new").await.unwrap();
        let now = Utc::now();
        users.mark_email_verified(id, now).await.unwrap();

        let alice = users.find_by_email("alice@x").await.unwrap().unwrap();
        assert_eq!(alice.password_hash, "new");
        assert!(alice.is_change_password);
        assert_eq!(alice.email_verified_at, Some(now));

        let missing = users.update_password(Id::new_v4(), "x").await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));
    }
}
