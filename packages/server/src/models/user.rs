use chrono::{DateTime, Utc};
use common::Role;
use serde::{Deserialize, Serialize};

use super::auth::{
    validate_department, validate_email, validate_name, validate_password, validate_student_id,
};
use super::shared::{Pagination, double_option, validate_length};
use crate::entity::user;
use crate::error::AppError;

/// Public profile of a user. Never includes the password hash.
#[derive(Serialize, Clone, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada@uni.ac.uk")]
    pub email: String,
    pub role: Role,
    #[schema(example = "Computer Science")]
    pub department: String,
    #[schema(example = "S1234567")]
    pub student_id: Option<String>,
    #[schema(example = "Dr")]
    pub supervisor_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            department: u.department,
            student_id: u.student_id,
            supervisor_title: u.supervisor_title,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Request body for an admin creating an account of any role.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department: String,
    /// Required for students, rejected for other roles.
    pub student_id: Option<String>,
    /// Only accepted for supervisors.
    pub supervisor_title: Option<String>,
}

pub fn validate_create_user(payload: &CreateUserRequest) -> Result<(), AppError> {
    validate_name(&payload.name)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    validate_department(&payload.department)?;
    validate_role_fields(
        payload.role,
        payload.student_id.as_deref(),
        payload.supervisor_title.as_deref(),
    )
}

/// Students carry a student number; only supervisors carry a title.
pub fn validate_role_fields(
    role: Role,
    student_id: Option<&str>,
    supervisor_title: Option<&str>,
) -> Result<(), AppError> {
    match role {
        Role::Student => {
            let id = student_id.ok_or_else(|| {
                AppError::Validation("Students must have a student_id".into())
            })?;
            validate_student_id(id)?;
        }
        Role::Supervisor | Role::Admin => {
            if student_id.is_some() {
                return Err(AppError::Validation(
                    "student_id is only allowed for students".into(),
                ));
            }
        }
    }
    match (role, supervisor_title) {
        (_, None) => Ok(()),
        (Role::Supervisor, Some(title)) => validate_length(title, "Supervisor title", 1, 50),
        (Role::Student | Role::Admin, Some(_)) => Err(AppError::Validation(
            "supervisor_title is only allowed for supervisors".into(),
        )),
    }
}

/// Partial update of a user. The role is fixed at creation.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// New password; re-hashed before storage.
    pub password: Option<String>,
    pub department: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub student_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub supervisor_title: Option<Option<String>>,
}

pub fn validate_update_user(payload: &UpdateUserRequest) -> Result<(), AppError> {
    if let Some(name) = &payload.name {
        validate_name(name)?;
    }
    if let Some(email) = &payload.email {
        validate_email(email)?;
    }
    if let Some(password) = &payload.password {
        validate_password(password)?;
    }
    if let Some(department) = &payload.department {
        validate_department(department)?;
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Page number (1-based). Default: 1.
    pub page: Option<u64>,
    /// Items per page (1-100). Default: 20.
    pub limit: Option<u64>,
    /// Only users with this role.
    pub role: Option<Role>,
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentListQuery {
    /// `true`: only students without a project. `false`: only assigned students.
    pub unassigned: Option<bool>,
    /// Only students of this department.
    pub department: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RoleCounts {
    pub students: u64,
    pub supervisors: u64,
    pub admins: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProjectStatusCounts {
    pub available: u64,
    pub assigned: u64,
    pub completed: u64,
}

/// Admin dashboard counters.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserStatsResponse {
    pub users: RoleCounts,
    /// Students not assigned to any project.
    pub unassigned_students: u64,
    pub projects: ProjectStatusCounts,
}
