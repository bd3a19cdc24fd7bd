use chrono::{DateTime, Utc};
use common::{MarkerRelation, ProjectStatus, ProjectType};
use serde::{Deserialize, Serialize};

use super::shared::{UserSummary, validate_length, validate_title};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProjectRequest {
    #[schema(example = "ML Thesis")]
    pub title: String,
    #[schema(example = "Explore graph neural networks for timetabling.")]
    pub description: String,
    pub project_type: ProjectType,
}

pub fn validate_create_project(payload: &CreateProjectRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_length(&payload.description, "Description", 1, 10_000)
}

/// Body of `PUT /project/apply`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ApplyRequest {
    /// Project ID.
    pub id: i32,
}

/// Body of `PUT /project/assign`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct AssignStudentRequest {
    /// Project ID.
    pub id: i32,
    pub student_id: i32,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AssignMarkerRequest {
    pub supervisor_id: i32,
}

/// The three submission deadlines of a project.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, utoipa::ToSchema)]
pub struct Deadlines {
    pub first: Option<DateTime<Utc>>,
    pub second: Option<DateTime<Utc>>,
    pub third: Option<DateTime<Utc>>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateDeadlinesRequest {
    pub first: DateTime<Utc>,
    pub second: DateTime<Utc>,
    pub third: DateTime<Utc>,
}

/// Deadlines may lie in the past (admin override) but must be strictly increasing.
pub fn validate_deadlines(payload: &UpdateDeadlinesRequest) -> Result<(), AppError> {
    if payload.first >= payload.second || payload.second >= payload.third {
        return Err(AppError::Validation(
            "Deadlines must be strictly increasing: first < second < third".into(),
        ));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectListQuery {
    /// Filter by status. Only honoured for supervisors and admins.
    pub status: Option<ProjectStatus>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProjectResponse {
    #[schema(example = 12)]
    pub id: i32,
    #[schema(example = "ML Thesis")]
    pub title: String,
    pub description: String,
    pub project_type: ProjectType,
    pub status: ProjectStatus,
    #[schema(example = "Computer Science")]
    pub department: String,
    pub supervisor_first: Option<UserSummary>,
    pub supervisor_second: Option<UserSummary>,
    pub third_marker: Option<UserSummary>,
    pub assigned_student: Option<UserSummary>,
    /// Students who applied. A student viewer only ever sees themselves here.
    pub applied_students: Vec<UserSummary>,
    pub deadlines: Deadlines,
    /// The viewer's position on the marker roster, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<MarkerRelation>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
