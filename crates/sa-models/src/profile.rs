//! Profile views returned by `/auth/me`
//!
//! Students get a [`StudentDetail`], everybody else an [`EmployeeDetail`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::user::{User, UserStatus};
use crate::Id;

/// Role name that selects the student profile
pub const STUDENT_ROLE: &str = "student";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
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
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_detail: Option<EmployeeDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_detail: Option<StudentDetail>,
}

impl UserDetail {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            email_verified_at: user.email_verified_at,
            status: user.status,
            gender: user.gender.clone(),
            religion: user.religion.clone(),
            birth_place: user.birth_place.clone(),
            birth_date: user.birth_date,
            phone_number: user.phone_number.clone(),
            address: user.address.clone(),
            nationality: user.nationality.clone(),
            img_path: user.img_path.clone(),
            img_name: user.img_name.clone(),
            is_change_password: user.is_change_password,
            roles: user.role_names(),
            permissions: user.permission_names(),
            created_at: user.created_at,
            updated_at: user.updated_at,
            employee_detail: None,
            student_detail: None,
        }
    }

    pub fn is_student(&self) -> bool {
        self.roles.iter().any(|r| r == STUDENT_ROLE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDetail {
    pub id: Id,
    pub nip: String,
    /// LECTURER or STAFF
    pub position: String,
    pub major_id: Option<Id>,
    pub major_name: Option<String>,
    pub study_program_id: Option<Id>,
    pub study_program_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDetail {
    pub id: Id,
    pub nim: String,
    pub generation: Option<i32>,
    pub major_id: Option<Id>,
    pub major_name: Option<String>,
    pub study_program_id: Option<Id>,
    pub study_program_name: Option<String>,
    #[serde(default)]
    pub semesters: Vec<StudentSemester>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSemester {
    pub id: Id,
    pub semester_id: Id,
    pub student_id: Id,
    pub class: String,
    pub is_active: bool,
}
