//! User repository
//!
//! Tables: m_user, model_has_roles, roles, role_has_permissions, permissions

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sa_models::{Id, Permission, Role, User, UserStatus};
use sqlx::{FromRow, PgPool};

use crate::repository::{RepositoryError, RepositoryResult, UserDirectory};

/// User database entity
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub password: String,
    pub status: String,
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
}

impl UserRow {
    fn into_user(self, roles: Vec<Role>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            email_verified_at: self.email_verified_at,
            password_hash: self.password,
            status: UserStatus::from_db(&self.status),
            gender: self.gender,
            religion: self.religion,
            birth_place: self.birth_place,
            birth_date: self.birth_date,
            phone_number: self.phone_number,
            address: self.address,
            nationality: self.nationality,
            img_path: self.img_path,
            img_name: self.img_name,
            is_change_password: self.is_change_password,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            roles,
        }
    }
}

/// One (role, permission) pair; roles without permissions appear once with
/// null permission columns
#[derive(Debug, Clone, FromRow)]
struct RoleGrantRow {
    role_id: Id,
    role_name: String,
    permission_id: Option<Id>,
    permission_name: Option<String>,
}

/// Fold grant rows (ordered by role) into roles
fn group_roles(rows: Vec<RoleGrantRow>) -> Vec<Role> {
    let mut roles: Vec<Role> = Vec::new();
    for row in rows {
        if roles.last().map(|r| r.id) != Some(row.role_id) {
            roles.push(Role {
                id: row.role_id,
                name: row.role_name,
                permissions: Vec::new(),
            });
        }
        if let (Some(id), Some(name), Some(role)) =
            (row.permission_id, row.permission_name, roles.last_mut())
        {
            role.permissions.push(Permission { id, name });
        }
    }
    roles
}

const USER_COLUMNS: &str = r#"
    id, name, email, email_verified_at, password, status, gender, religion,
    birth_place, birth_date, phone_number, address, nationality, img_path,
    img_name, is_change_password, created_at, updated_at, deleted_at
"#;

/// User repository implementation
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn roles_for(&self, user_id: Id) -> RepositoryResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleGrantRow>(
            r#"
            SELECT r.uuid AS role_id, r.name AS role_name,
                   p.uuid AS permission_id, p.name AS permission_name
            FROM model_has_roles mhr
            JOIN roles r ON r.uuid = mhr.role_id
            LEFT JOIN role_has_permissions rhp ON rhp.role_id = r.uuid
            LEFT JOIN permissions p ON p.uuid = rhp.permission_id
            WHERE mhr.model_uuid = $1
            ORDER BY r.name ASC, r.uuid ASC, p.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(group_roles(rows))
    }

    async fn with_roles(&self, row: Option<UserRow>) -> RepositoryResult<Option<User>> {
        match row {
            Some(row) => {
                let roles = self.roles_for(row.id).await?;
                Ok(Some(row.into_user(roles)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserDirectory for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM m_user WHERE email = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        self.with_roles(row).await
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM m_user WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_roles(row).await
    }

    async fn update_password(&self, id: Id, password_hash: &str) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE m_user
            SET password = $2, is_change_password = TRUE, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn mark_email_verified(&self, id: Id, at: DateTime<Utc>) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE m_user
            SET email_verified_at = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(role: Id, role_name: &str, perm: Option<&str>) -> RoleGrantRow {
        RoleGrantRow {
            role_id: role,
            role_name: role_name.to_string(),
            permission_id: perm.map(|_| Id::new_v4()),
            permission_name: perm.map(str::to_string),
        }
    }

    #[test]
    fn test_group_roles() {
        let admin = Id::new_v4();
        let guest = Id::new_v4();
        let roles = group_roles(vec![
            grant(admin, "admin", Some("edit-major")),
            grant(admin, "admin", Some("view-major")),
            grant(guest, "guest", None),
        ]);

        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].name, "admin");
        assert_eq!(roles[0].permissions.len(), 2);
        assert_eq!(roles[1].name, "guest");
        assert!(roles[1].permissions.is_empty());
    }
}
