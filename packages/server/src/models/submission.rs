use chrono::{DateTime, Utc};
use common::grading::{AssessmentEntry, MAX_MARKS, MIN_MARKS};
use common::{Completeness, FinalGrade, FinalGradeStrategy, GradeLetter, MarkerRelation, SubmissionSlot};
use serde::{Deserialize, Serialize};

use super::shared::UserSummary;
use crate::error::AppError;

/// Map an API `submission_number` (1-3) to its slot.
pub fn parse_submission_number(number: i32) -> Result<SubmissionSlot, AppError> {
    SubmissionSlot::from_number(number).ok_or_else(|| {
        AppError::Validation(format!(
            "Invalid submission_number {number}: must be 1, 2 or 3"
        ))
    })
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UploadUrlRequest {
    pub project_id: i32,
    #[schema(example = 1, minimum = 1, maximum = 3)]
    pub submission_number: i32,
    #[schema(example = "thesis_final.pdf")]
    pub file_name: String,
    #[schema(example = "application/pdf")]
    pub file_type: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadUrlResponse {
    /// Pre-signed `PUT` URL. The client uploads the file body directly.
    pub upload_url: String,
    /// Object key to send back to `save-data`.
    #[schema(example = "submissions/12/1/0190c1a2-thesis_final.pdf")]
    pub s3_key: String,
    pub file_name: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SaveSubmissionRequest {
    pub project_id: i32,
    #[schema(example = 1, minimum = 1, maximum = 3)]
    pub submission_number: i32,
    pub s3_key: String,
    pub file_name: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmissionDetailRequest {
    pub project_id: i32,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadUrlQuery {
    /// Object key of the submission file. `s3Key` is accepted too.
    #[serde(alias = "s3Key")]
    pub s3_key: String,
    /// File name offered to the browser. `fileName` is accepted too.
    #[serde(alias = "fileName")]
    pub file_name: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DownloadUrlResponse {
    /// Pre-signed `GET` URL.
    pub download_url: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct GradeSubmissionRequest {
    pub project_id: i32,
    #[schema(example = 1, minimum = 1, maximum = 3)]
    pub submission_number: i32,
    #[schema(example = 85, minimum = 0, maximum = 100)]
    pub marks: i32,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub formative_feedback: String,
    /// Grades per rubric category. Partial assessments are accepted.
    #[serde(default)]
    pub summative_assessment: Vec<AssessmentEntry>,
}

pub fn validate_marks(marks: i32) -> Result<(), AppError> {
    if !(MIN_MARKS..=MAX_MARKS).contains(&marks) {
        return Err(AppError::Validation(format!(
            "Marks must be between {MIN_MARKS} and {MAX_MARKS}"
        )));
    }
    Ok(())
}

pub fn validate_grade_request(payload: &GradeSubmissionRequest) -> Result<(), AppError> {
    validate_marks(payload.marks)?;
    if payload.justification.chars().count() > 5000 {
        return Err(AppError::Validation(
            "Justification must be at most 5000 characters".into(),
        ));
    }
    if payload.formative_feedback.chars().count() > 5000 {
        return Err(AppError::Validation(
            "Formative feedback must be at most 5000 characters".into(),
        ));
    }
    Ok(())
}

/// Body of `PUT /submission/moderate`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ModerateRequest {
    pub project_id: i32,
    #[schema(example = 3, minimum = 1, maximum = 3)]
    pub submission_number: i32,
    #[schema(example = 72, minimum = 0, maximum = 100)]
    pub marks: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GradingResponse {
    pub id: i32,
    pub marker: Option<UserSummary>,
    /// Roster position of the marker at the time of viewing.
    pub relation: Option<MarkerRelation>,
    pub marks: i32,
    pub grade: Option<GradeLetter>,
    pub justification: String,
    pub formative_feedback: String,
    pub summative_assessment: Vec<AssessmentEntry>,
    pub graded_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    #[schema(example = 1)]
    pub submission_number: i32,
    #[schema(example = "Draft Proposal")]
    pub label: String,
    pub file_name: String,
    pub s3_key: String,
    pub is_late: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// In arrival order. Empty for students until the submission is complete.
    pub gradings: Vec<GradingResponse>,
    pub completeness: Completeness,
    pub final_grade: Option<FinalGrade>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionDetailResponse {
    pub project_id: i32,
    #[schema(value_type = String, example = "average")]
    pub final_grade_strategy: FinalGradeStrategy,
    /// Ordered by submission number; missing slots are omitted.
    pub submissions: Vec<SubmissionResponse>,
}

/// Result of a grading upsert.
#[derive(Serialize, utoipa::ToSchema)]
pub struct GradeSubmissionResponse {
    pub submission_id: i32,
    pub grading: GradingResponse,
    pub completeness: Completeness,
    pub final_grade: Option<FinalGrade>,
}

/// Grading state of one slot on the supervisor dashboard.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardSlot {
    pub submission_number: i32,
    pub label: String,
    pub deadline: Option<DateTime<Utc>>,
    pub submitted: bool,
    pub submission_id: Option<i32>,
    pub is_late: bool,
    pub gradings_received: usize,
    pub gradings_required: usize,
    pub is_complete: bool,
    /// Whether the viewing supervisor has already graded this slot.
    pub graded_by_me: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardProject {
    pub project_id: i32,
    pub title: String,
    pub relation: MarkerRelation,
    pub assigned_student: Option<UserSummary>,
    pub slots: Vec<DashboardSlot>,
}
