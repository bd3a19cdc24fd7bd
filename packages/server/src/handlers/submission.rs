use std::collections::HashMap;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::grading::{AssessmentEntry, MarkerMarks, normalize_assessment};
use common::{
    Completeness, FinalGrade, FinalGradeStrategy, GradeLetter, Role, SubmissionSlot,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{grading, project, submission, upload_intent, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::UserSummary;
use crate::models::submission::*;
use crate::state::AppState;
use crate::utils::filename::{FilenameError, validate_upload, validate_upload_filename};
use crate::utils::project::{find_project, find_project_for_update, load_users};

fn filename_error(e: FilenameError) -> AppError {
    AppError::Validation(e.message().into())
}

/// Object key layout: `submissions/{project}/{submission_number}/{uuid}-{file_name}`.
fn object_key(project_id: i32, slot: SubmissionSlot, file_name: &str) -> String {
    format!(
        "submissions/{}/{}/{}-{}",
        project_id,
        slot.number(),
        uuid::Uuid::now_v7(),
        file_name
    )
}

/// Who is looking at a project's submissions.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Viewer {
    Student,
    Marker,
    Admin,
}

impl Viewer {
    fn of(auth_user: &AuthUser, project: &project::Model) -> Option<Self> {
        match auth_user.role {
            Role::Admin => Some(Self::Admin),
            Role::Supervisor if project.roster().contains(auth_user.user_id) => Some(Self::Marker),
            Role::Student if project.assigned_student_id == Some(auth_user.user_id) => {
                Some(Self::Student)
            }
            Role::Supervisor | Role::Student => None,
        }
    }
}

async fn find_slot<C: ConnectionTrait>(
    db: &C,
    project_id: i32,
    slot: SubmissionSlot,
) -> Result<Option<submission::Model>, AppError> {
    Ok(submission::Entity::find()
        .filter(submission::Column::ProjectId.eq(project_id))
        .filter(submission::Column::Slot.eq(slot))
        .one(db)
        .await?)
}

/// Gradings of the given submissions in arrival order.
async fn load_gradings<C: ConnectionTrait>(
    db: &C,
    submission_ids: Vec<i32>,
) -> Result<Vec<grading::Model>, AppError> {
    if submission_ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(grading::Entity::find()
        .filter(grading::Column::SubmissionId.is_in(submission_ids))
        .order_by_asc(grading::Column::Id)
        .all(db)
        .await?)
}

async fn count_gradings<C: ConnectionTrait>(db: &C, submission_id: i32) -> Result<u64, AppError> {
    Ok(grading::Entity::find()
        .filter(grading::Column::SubmissionId.eq(submission_id))
        .count(db)
        .await?)
}

fn released_final(completeness: &Completeness, final_marks: Option<i32>) -> Option<FinalGrade> {
    if completeness.is_complete {
        final_marks.and_then(FinalGrade::from_marks)
    } else {
        None
    }
}

fn grading_response(
    g: grading::Model,
    project: &project::Model,
    users: &HashMap<i32, user::Model>,
) -> GradingResponse {
    let summative_assessment: Vec<AssessmentEntry> =
        serde_json::from_value(g.summative_assessment).unwrap_or_else(|e| {
            tracing::warn!(grading_id = g.id, error = %e, "Stored assessment is unreadable");
            Vec::new()
        });
    GradingResponse {
        id: g.id,
        marker: users.get(&g.marker_id).map(UserSummary::from),
        relation: project.roster().relation_of(g.marker_id),
        marks: g.marks,
        grade: GradeLetter::from_marks(g.marks),
        justification: g.justification,
        formative_feedback: g.formative_feedback,
        summative_assessment,
        graded_at: g.graded_at,
    }
}

async fn submission_responses<C: ConnectionTrait>(
    db: &C,
    project: &project::Model,
    viewer: Viewer,
    submissions: Vec<submission::Model>,
) -> Result<Vec<SubmissionResponse>, AppError> {
    let gradings = load_gradings(db, submissions.iter().map(|s| s.id).collect()).await?;
    let users = load_users(db, gradings.iter().map(|g| g.marker_id)).await?;

    let mut by_submission: HashMap<i32, Vec<grading::Model>> = HashMap::new();
    for g in gradings {
        by_submission.entry(g.submission_id).or_default().push(g);
    }

    let roster = project.roster();
    Ok(submissions
        .into_iter()
        .map(|s| {
            let gradings = by_submission.remove(&s.id).unwrap_or_default();
            let completeness = Completeness::evaluate(&roster, gradings.len());
            let reveal = viewer != Viewer::Student || completeness.is_complete;
            SubmissionResponse {
                id: s.id,
                submission_number: s.slot.number(),
                label: s.slot.label().to_string(),
                final_grade: released_final(&completeness, s.final_marks),
                gradings: if reveal {
                    gradings
                        .into_iter()
                        .map(|g| grading_response(g, project, &users))
                        .collect()
                } else {
                    Vec::new()
                },
                completeness,
                file_name: s.file_name,
                s3_key: s.s3_key,
                is_late: s.is_late,
                created_at: s.created_at,
                updated_at: s.updated_at,
            }
        })
        .collect())
}

/// Recompute and store the final marks of a submission after its gradings changed.
///
/// Automatic strategies store a result only while the submission is complete.
/// Moderated marks survive a marker revising their grading but are withdrawn
/// when a new marker's grading arrives, so the admin moderates again.
async fn refresh_final_marks<C: ConnectionTrait>(
    db: &C,
    strategy: FinalGradeStrategy,
    project: &project::Model,
    sub: submission::Model,
    new_grader: bool,
) -> Result<(submission::Model, Completeness), AppError> {
    let gradings = load_gradings(db, vec![sub.id]).await?;
    let roster = project.roster();
    let completeness = Completeness::evaluate(&roster, gradings.len());

    let final_marks = match strategy {
        FinalGradeStrategy::Moderated if new_grader => None,
        FinalGradeStrategy::Moderated => sub.final_marks,
        FinalGradeStrategy::Average | FinalGradeStrategy::FirstMarker => {
            if completeness.is_complete {
                let marks: Vec<MarkerMarks> = gradings
                    .iter()
                    .filter_map(|g| {
                        roster.relation_of(g.marker_id).map(|relation| MarkerMarks {
                            relation,
                            marks: g.marks,
                        })
                    })
                    .collect();
                strategy.resolve(&marks).map(|f| f.marks)
            } else {
                None
            }
        }
    };

    if final_marks == sub.final_marks {
        return Ok((sub, completeness));
    }
    let mut active: submission::ActiveModel = sub.into();
    active.final_marks = Set(final_marks);
    let updated = active.update(db).await?;
    match final_marks {
        Some(marks) => tracing::info!(submission_id = updated.id, marks, "Final grade released"),
        None if new_grader && strategy == FinalGradeStrategy::Moderated => {
            tracing::info!(submission_id = updated.id, "Moderated grade withdrawn for a new marker")
        }
        None => {}
    }
    Ok((updated, completeness))
}

#[utoipa::path(
    post,
    path = "/submission/generate-upload-url",
    tag = "Submissions",
    operation_id = "generateUploadUrl",
    summary = "Get a signed URL to upload a deliverable",
    description = "Assigned student only. The file name must match `^[A-Za-z0-9_-]+\\.(pdf|docx|zip)$` and `file_type` must be the matching MIME type. The returned `s3_key` is remembered and must be passed to `save-data` once the upload finished.",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Signed upload URL", body = UploadUrlResponse),
        (status = 400, description = "Bad file name, file type or submission number (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the assigned student (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Slot already graded or project completed (CONFLICT)", body = ErrorBody),
        (status = 502, description = "Object store failed (UPSTREAM_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(project_id = payload.project_id, submission_number = payload.submission_number))]
pub async fn generate_upload_url(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    auth_user.require_role(Role::Student)?;
    let slot = parse_submission_number(payload.submission_number)?;
    let kind = validate_upload(&payload.file_name, &payload.file_type).map_err(filename_error)?;

    let project = find_project(&state.db, payload.project_id).await?;
    if project.assigned_student_id != Some(auth_user.user_id) {
        return Err(AppError::PermissionDenied);
    }
    if project.status == common::ProjectStatus::Completed {
        return Err(AppError::Conflict("Project is completed".into()));
    }
    if let Some(existing) = find_slot(&state.db, project.id, slot).await?
        && count_gradings(&state.db, existing.id).await? > 0
    {
        return Err(AppError::Conflict(
            "This submission has been graded and can no longer be replaced".into(),
        ));
    }

    let key = object_key(project.id, slot, &payload.file_name);
    let upload_url = state.storage.upload_url(&key, kind.mime_type()).await?;

    upload_intent::ActiveModel {
        s3_key: Set(key.clone()),
        project_id: Set(project.id),
        slot: Set(slot),
        student_id: Set(auth_user.user_id),
        issued_at: Set(chrono::Utc::now()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(s3_key = %key, "Upload URL issued");
    Ok(Json(UploadUrlResponse {
        upload_url,
        s3_key: key,
        file_name: payload.file_name,
    }))
}

#[utoipa::path(
    post,
    path = "/submission/save-data",
    tag = "Submissions",
    operation_id = "saveSubmission",
    summary = "Record an uploaded deliverable",
    description = "Assigned student only. The key must have been issued to the caller for this project and slot, and the object must exist in storage. Replaces an earlier file of the slot while it has no gradings.",
    request_body = SaveSubmissionRequest,
    responses(
        (status = 201, description = "Submission saved", body = SubmissionResponse),
        (status = 400, description = "Unknown key, missing object or bad input (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the assigned student (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Slot already graded (CONFLICT)", body = ErrorBody),
        (status = 502, description = "Object store failed (UPSTREAM_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(project_id = payload.project_id, submission_number = payload.submission_number, s3_key = %payload.s3_key))]
pub async fn save_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SaveSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_role(Role::Student)?;
    let slot = parse_submission_number(payload.submission_number)?;
    validate_upload_filename(&payload.file_name).map_err(filename_error)?;

    let project = find_project(&state.db, payload.project_id).await?;
    if project.assigned_student_id != Some(auth_user.user_id) {
        return Err(AppError::PermissionDenied);
    }

    let intent = upload_intent::Entity::find_by_id(payload.s3_key.clone())
        .one(&state.db)
        .await?
        .filter(|i| {
            i.project_id == project.id && i.slot == slot && i.student_id == auth_user.user_id
        })
        .ok_or_else(|| {
            AppError::Validation("s3_key was not issued for this submission".into())
        })?;
    if !intent
        .s3_key
        .ends_with(&format!("-{}", payload.file_name))
    {
        return Err(AppError::Validation(
            "file_name does not match the uploaded file".into(),
        ));
    }
    let now = chrono::Utc::now();
    let grace = chrono::Duration::seconds(state.config.reconcile.grace_secs as i64);
    if intent.issued_at < now - grace {
        return Err(AppError::Validation(
            "The upload URL has expired, request a new one".into(),
        ));
    }
    if !state.storage.exists(&intent.s3_key).await? {
        return Err(AppError::Validation(
            "The file has not been uploaded yet".into(),
        ));
    }

    let is_late = project.deadline_for(slot).is_some_and(|d| now > d);

    let txn = state.db.begin().await?;
    // Serializes with grading so a slot cannot be replaced while a grade lands.
    find_project_for_update(&txn, project.id).await?;
    let existing = find_slot(&txn, project.id, slot).await?;
    let (saved, replaced_key) = match existing {
        Some(existing) => {
            if count_gradings(&txn, existing.id).await? > 0 {
                return Err(AppError::Conflict(
                    "This submission has been graded and can no longer be replaced".into(),
                ));
            }
            let old_key = existing.s3_key.clone();
            let mut active: submission::ActiveModel = existing.into();
            active.file_name = Set(payload.file_name.clone());
            active.s3_key = Set(intent.s3_key.clone());
            active.is_late = Set(is_late);
            active.updated_at = Set(now);
            (active.update(&txn).await?, Some(old_key))
        }
        None => {
            let inserted = submission::ActiveModel {
                project_id: Set(project.id),
                slot: Set(slot),
                file_name: Set(payload.file_name.clone()),
                s3_key: Set(intent.s3_key.clone()),
                is_late: Set(is_late),
                final_marks: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
                    "This slot was saved concurrently, please retry".into(),
                ),
                _ => AppError::from(e),
            })?;
            (inserted, None)
        }
    };
    let consumed = upload_intent::Entity::delete_by_id(intent.s3_key.clone())
        .exec(&txn)
        .await?;
    if consumed.rows_affected != 1 {
        return Err(AppError::Conflict(
            "The upload expired before it was saved, request a new upload URL".into(),
        ));
    }
    txn.commit().await?;

    if let Some(old_key) = replaced_key.filter(|k| *k != saved.s3_key) {
        match state.storage.delete(&old_key).await {
            Ok(_) => tracing::info!(s3_key = %old_key, "Replaced submission file deleted"),
            Err(e) => tracing::warn!(s3_key = %old_key, error = %e, "Failed to delete replaced file"),
        }
    }

    tracing::info!(submission_id = saved.id, is_late, "Submission saved");
    let mut responses =
        submission_responses(&state.db, &project, Viewer::Student, vec![saved]).await?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::Internal("Submission response was not built".into()))?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/submission/detail",
    tag = "Submissions",
    operation_id = "submissionDetail",
    summary = "All submissions of a project with their gradings",
    description = "For the assigned student, the marker roster and admins. Students see gradings and the final grade only once a submission is complete.",
    request_body = SubmissionDetailRequest,
    responses(
        (status = 200, description = "Submissions by slot", body = SubmissionDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(project_id = payload.project_id))]
pub async fn submission_detail(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SubmissionDetailRequest>,
) -> Result<Json<SubmissionDetailResponse>, AppError> {
    let project = find_project(&state.db, payload.project_id).await?;
    let viewer = Viewer::of(&auth_user, &project).ok_or(AppError::PermissionDenied)?;

    let submissions = submission::Entity::find()
        .filter(submission::Column::ProjectId.eq(project.id))
        .order_by_asc(submission::Column::Slot)
        .all(&state.db)
        .await?;

    Ok(Json(SubmissionDetailResponse {
        project_id: project.id,
        final_grade_strategy: state.config.grading.final_grade_strategy,
        submissions: submission_responses(&state.db, &project, viewer, submissions).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/submission/generate-download-url",
    tag = "Submissions",
    operation_id = "generateDownloadUrl",
    summary = "Get a signed URL to download a deliverable",
    description = "The key must belong to a submission the caller can see. Unknown or hidden keys answer 404.",
    params(DownloadUrlQuery),
    responses(
        (status = 200, description = "Signed download URL", body = DownloadUrlResponse),
        (status = 400, description = "Bad file name (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Object store failed (UPSTREAM_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(s3_key = %query.s3_key))]
pub async fn generate_download_url(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DownloadUrlQuery>,
) -> Result<Json<DownloadUrlResponse>, AppError> {
    let not_found = || AppError::NotFound("File not found".into());

    let sub = submission::Entity::find()
        .filter(submission::Column::S3Key.eq(&query.s3_key))
        .one(&state.db)
        .await?
        .ok_or_else(not_found)?;
    let project = find_project(&state.db, sub.project_id).await?;
    if Viewer::of(&auth_user, &project).is_none() {
        return Err(not_found());
    }

    let file_name = match query.file_name {
        Some(name) => {
            validate_upload_filename(&name).map_err(filename_error)?;
            name
        }
        None => sub.file_name,
    };
    let download_url = state.storage.download_url(&sub.s3_key, &file_name).await?;
    Ok(Json(DownloadUrlResponse { download_url }))
}

#[utoipa::path(
    post,
    path = "/submission/grade-submission",
    tag = "Grading",
    operation_id = "gradeSubmission",
    summary = "Create or update the caller's grading of a submission",
    description = "Only supervisors on the project's marker roster. Each marker owns one grading per submission; grading again updates it in place. Once every marker has graded, the final grade is computed with the configured strategy.",
    request_body = GradeSubmissionRequest,
    responses(
        (status = 200, description = "Grading stored", body = GradeSubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not on the marker roster (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project or submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(project_id = payload.project_id, submission_number = payload.submission_number, marker_id = auth_user.user_id))]
pub async fn grade_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<GradeSubmissionRequest>,
) -> Result<Json<GradeSubmissionResponse>, AppError> {
    auth_user.require_role(Role::Supervisor)?;
    let slot = parse_submission_number(payload.submission_number)?;
    validate_grade_request(&payload)?;
    let assessment = normalize_assessment(payload.summative_assessment)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let assessment = serde_json::to_value(&assessment)
        .map_err(|e| AppError::Internal(format!("Assessment serialization error: {}", e)))?;

    let txn = state.db.begin().await?;
    let project = find_project_for_update(&txn, payload.project_id).await?;
    if !project.roster().contains(auth_user.user_id) {
        return Err(AppError::PermissionDenied);
    }
    let sub = find_slot(&txn, project.id, slot)
        .await?
        .ok_or_else(|| AppError::NotFound("Nothing has been submitted for this slot".into()))?;
    let new_grader = grading::Entity::find()
        .filter(grading::Column::SubmissionId.eq(sub.id))
        .filter(grading::Column::MarkerId.eq(auth_user.user_id))
        .count(&txn)
        .await?
        == 0;

    let row = grading::ActiveModel {
        submission_id: Set(sub.id),
        marker_id: Set(auth_user.user_id),
        marks: Set(payload.marks),
        justification: Set(payload.justification.trim().to_string()),
        formative_feedback: Set(payload.formative_feedback.trim().to_string()),
        summative_assessment: Set(assessment),
        graded_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    grading::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([grading::Column::SubmissionId, grading::Column::MarkerId])
                .update_columns([
                    grading::Column::Marks,
                    grading::Column::Justification,
                    grading::Column::FormativeFeedback,
                    grading::Column::SummativeAssessment,
                    grading::Column::GradedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    let stored = grading::Entity::find()
        .filter(grading::Column::SubmissionId.eq(sub.id))
        .filter(grading::Column::MarkerId.eq(auth_user.user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal("Grading vanished after upsert".into()))?;

    let strategy = state.config.grading.final_grade_strategy;
    let (sub, completeness) = refresh_final_marks(&txn, strategy, &project, sub, new_grader).await?;
    txn.commit().await?;

    tracing::info!(
        submission_id = sub.id,
        received = completeness.received,
        required = completeness.required,
        "Grading stored"
    );
    let users = load_users(&state.db, [auth_user.user_id]).await?;
    Ok(Json(GradeSubmissionResponse {
        submission_id: sub.id,
        grading: grading_response(stored, &project, &users),
        final_grade: released_final(&completeness, sub.final_marks),
        completeness,
    }))
}

#[utoipa::path(
    put,
    path = "/submission/moderate",
    tag = "Grading",
    operation_id = "moderateSubmission",
    summary = "Record moderated final marks",
    description = "Admin only, and only when the server runs the `moderated` final grade strategy. The submission must be fully graded.",
    request_body = ModerateRequest,
    responses(
        (status = 200, description = "Final grade recorded", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project or submission not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Strategy is automatic or submission incomplete (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(project_id = payload.project_id, submission_number = payload.submission_number))]
pub async fn moderate_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ModerateRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    auth_user.require_role(Role::Admin)?;
    let slot = parse_submission_number(payload.submission_number)?;
    validate_marks(payload.marks)?;
    let strategy = state.config.grading.final_grade_strategy;
    if strategy != FinalGradeStrategy::Moderated {
        return Err(AppError::Conflict(format!(
            "Final grades are computed automatically ({strategy:?} strategy)"
        )));
    }

    let txn = state.db.begin().await?;
    let project = find_project_for_update(&txn, payload.project_id).await?;
    let sub = find_slot(&txn, project.id, slot)
        .await?
        .ok_or_else(|| AppError::NotFound("Nothing has been submitted for this slot".into()))?;
    let received = count_gradings(&txn, sub.id).await? as usize;
    if !Completeness::evaluate(&project.roster(), received).is_complete {
        return Err(AppError::Conflict(
            "Every marker must grade the submission before moderation".into(),
        ));
    }

    let mut active: submission::ActiveModel = sub.into();
    active.final_marks = Set(Some(payload.marks));
    let sub = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(submission_id = sub.id, marks = payload.marks, "Moderated grade recorded");
    let mut responses = submission_responses(&state.db, &project, Viewer::Admin, vec![sub]).await?;
    responses
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::Internal("Submission response was not built".into()))
}

#[utoipa::path(
    get,
    path = "/submission/supervisor/submissions",
    tag = "Grading",
    operation_id = "supervisorDashboard",
    summary = "Grading overview for the calling supervisor",
    description = "One entry per project the caller marks, with the state of all three slots.",
    responses(
        (status = 200, description = "Dashboard", body = Vec<DashboardProject>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn supervisor_dashboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DashboardProject>>, AppError> {
    auth_user.require_role(Role::Supervisor)?;
    let me = auth_user.user_id;

    let projects = project::Entity::find()
        .filter(
            Condition::any()
                .add(project::Column::SupervisorFirstId.eq(me))
                .add(project::Column::SupervisorSecondId.eq(me))
                .add(project::Column::ThirdMarkerId.eq(me)),
        )
        .order_by_asc(project::Column::Id)
        .all(&state.db)
        .await?;
    if projects.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let submissions = submission::Entity::find()
        .filter(submission::Column::ProjectId.is_in(projects.iter().map(|p| p.id)))
        .all(&state.db)
        .await?;
    let gradings = load_gradings(&state.db, submissions.iter().map(|s| s.id).collect()).await?;
    let students = load_users(&state.db, projects.iter().filter_map(|p| p.assigned_student_id)).await?;

    let mut graders: HashMap<i32, Vec<i32>> = HashMap::new();
    for g in &gradings {
        graders.entry(g.submission_id).or_default().push(g.marker_id);
    }

    let dashboard = projects
        .iter()
        .filter_map(|p| {
            let roster = p.roster();
            let relation = roster.relation_of(me)?;
            let slots = SubmissionSlot::ALL
                .iter()
                .map(|&slot| {
                    let sub = submissions
                        .iter()
                        .find(|s| s.project_id == p.id && s.slot == slot);
                    let marker_ids = sub
                        .and_then(|s| graders.get(&s.id))
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    let completeness = Completeness::evaluate(&roster, marker_ids.len());
                    DashboardSlot {
                        submission_number: slot.number(),
                        label: slot.label().to_string(),
                        deadline: p.deadline_for(slot),
                        submitted: sub.is_some(),
                        submission_id: sub.map(|s| s.id),
                        is_late: sub.is_some_and(|s| s.is_late),
                        gradings_received: completeness.received,
                        gradings_required: completeness.required,
                        is_complete: sub.is_some() && completeness.is_complete,
                        graded_by_me: marker_ids.contains(&me),
                    }
                })
                .collect();
            Some(DashboardProject {
                project_id: p.id,
                title: p.title.clone(),
                relation,
                assigned_student: p
                    .assigned_student_id
                    .and_then(|id| students.get(&id))
                    .map(UserSummary::from),
                slots,
            })
        })
        .collect();

    Ok(Json(dashboard))
}
