//! Employee and student profile repository
//!
//! Tables: m_employee, m_student, m_student_semester, m_major, m_study_program

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sa_models::{EmployeeDetail, Id, StudentDetail, StudentSemester};
use sqlx::{FromRow, PgPool};

use crate::repository::{ProfileDirectory, RepositoryResult};

#[derive(Debug, Clone, FromRow)]
struct EmployeeRow {
    id: Id,
    nip: String,
    position: String,
    major_id: Option<Id>,
    major_name: Option<String>,
    study_program_id: Option<Id>,
    study_program_name: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
struct StudentRow {
    id: Id,
    nim: String,
    generation: Option<i32>,
    major_id: Option<Id>,
    major_name: Option<String>,
    study_program_id: Option<Id>,
    study_program_name: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
struct StudentSemesterRow {
    id: Id,
    semester_id: Id,
    student_id: Id,
    class: String,
    is_active: bool,
}

pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileRepository {
    async fn employee_by_user(&self, user_id: Id) -> RepositoryResult<Option<EmployeeDetail>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT e.id, e.nip, e.position,
                   e.m_major_id AS major_id, m.name AS major_name,
                   e.m_study_program_id AS study_program_id, sp.name AS study_program_name,
                   e.created_at, e.updated_at
            FROM m_employee e
            LEFT JOIN m_major m ON m.id = e.m_major_id
            LEFT JOIN m_study_program sp ON sp.id = e.m_study_program_id
            WHERE e.m_user_id = $1 AND e.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| EmployeeDetail {
            id: r.id,
            nip: r.nip,
            position: r.position,
            major_id: r.major_id,
            major_name: r.major_name,
            study_program_id: r.study_program_id,
            study_program_name: r.study_program_name,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }

    async fn student_by_user(&self, user_id: Id) -> RepositoryResult<Option<StudentDetail>> {
        let Some(row) = sqlx::query_as::<_, StudentRow>(
            r#"
            SELECT s.id, s.nim, s.generation,
                   sp.m_major_id AS major_id, m.name AS major_name,
                   sp.id AS study_program_id, sp.name AS study_program_name,
                   s.created_at, s.updated_at
            FROM m_student s
            LEFT JOIN m_study_program sp ON sp.id = s.m_study_program_id
            LEFT JOIN m_major m ON m.id = sp.m_major_id
            WHERE s.m_user_id = $1 AND s.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let semesters = sqlx::query_as::<_, StudentSemesterRow>(
            r#"
            SELECT id, m_semester_id AS semester_id, m_student_id AS student_id,
                   class, is_active
            FROM m_student_semester
            WHERE m_student_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(StudentDetail {
            id: row.id,
            nim: row.nim,
            generation: row.generation,
            major_id: row.major_id,
            major_name: row.major_name,
            study_program_id: row.study_program_id,
            study_program_name: row.study_program_name,
            semesters: semesters
                .into_iter()
                .map(|s| StudentSemester {
                    id: s.id,
                    semester_id: s.semester_id,
                    student_id: s.student_id,
                    class: s.class,
                    is_active: s.is_active,
                })
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}
